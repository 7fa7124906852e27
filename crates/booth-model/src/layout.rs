//! Strip layouts and the slot geometry table.
//!
//! A layout fixes how many shots a session takes and where each shot's
//! local/remote square pair lands on the output surface. The table is
//! configuration: it can be loaded from JSON and is validated once before
//! any session uses it.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// The selectable strip arrangements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutKind {
    /// One large pair.
    Single,
    /// Two stacked pairs.
    #[serde(alias = "grid")]
    TwoRow,
    /// Three stacked pairs (classic strip).
    #[serde(alias = "strip")]
    ThreeRow,
}

impl LayoutKind {
    pub const ALL: [LayoutKind; 3] = [LayoutKind::Single, LayoutKind::TwoRow, LayoutKind::ThreeRow];

    /// Number of shots a session with this layout takes.
    pub fn shot_count(self) -> usize {
        match self {
            LayoutKind::Single => 1,
            LayoutKind::TwoRow => 2,
            LayoutKind::ThreeRow => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LayoutKind::Single => "single",
            LayoutKind::TwoRow => "two-row",
            LayoutKind::ThreeRow => "three-row",
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(LayoutKind::Single),
            "two-row" | "grid" => Ok(LayoutKind::TwoRow),
            "three-row" | "strip" => Ok(LayoutKind::ThreeRow),
            _ => Err(ModelError::UnknownValue {
                kind: "layout",
                value: s.to_string(),
            }),
        }
    }
}

/// An axis-aligned square on the output surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SquareRect {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

impl SquareRect {
    pub fn new(x: u32, y: u32, size: u32) -> Self {
        Self { x, y, size }
    }

    /// Exclusive right edge, clamped at `u32::MAX`.
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.size)
    }

    /// Exclusive bottom edge, clamped at `u32::MAX`.
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.size)
    }

    /// Whether the two squares share at least one pixel.
    pub fn overlaps(&self, other: &SquareRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Whether the square lies entirely within a `width` x `height` canvas.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width && self.bottom() <= height
    }
}

/// Where one shot lands: the local square and the remote square beside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotSlot {
    /// Zero-based shot index.
    pub index: usize,
    /// Local (mirrored) square.
    pub left: SquareRect,
    /// Remote square.
    pub right: SquareRect,
}

/// Origin and size of one row; the remote square follows at `pair_gap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSpec {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

/// Canvas size and rows for one layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutGeometry {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Horizontal gap between the local and remote squares of a row.
    pub pair_gap: u32,
    pub rows: Vec<RowSpec>,
}

impl LayoutGeometry {
    fn uniform(canvas: (u32, u32), x: u32, size: u32, pair_gap: u32, ys: &[u32]) -> Self {
        Self {
            canvas_width: canvas.0,
            canvas_height: canvas.1,
            pair_gap,
            rows: ys.iter().map(|&y| RowSpec { x, y, size }).collect(),
        }
    }

    /// Slot for a shot index, if the layout has that many rows.
    pub fn slot(&self, index: usize) -> Option<ShotSlot> {
        let row = self.rows.get(index)?;
        Some(ShotSlot {
            index,
            left: SquareRect::new(row.x, row.y, row.size),
            right: SquareRect::new(
                row.x.saturating_add(row.size).saturating_add(self.pair_gap),
                row.y,
                row.size,
            ),
        })
    }

    /// All slots in shot order.
    pub fn slots(&self) -> Vec<ShotSlot> {
        (0..self.rows.len()).filter_map(|i| self.slot(i)).collect()
    }
}

/// Declarative `{layout, shot index} -> slot` lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutTable {
    pub single: LayoutGeometry,
    pub two_row: LayoutGeometry,
    pub three_row: LayoutGeometry,
    /// Distance from the bottom edge to the caption baseline; squares
    /// must end above it.
    #[serde(default = "default_caption_margin")]
    pub caption_margin: u32,
}

fn default_caption_margin() -> u32 {
    40
}

impl Default for LayoutTable {
    fn default() -> Self {
        Self {
            single: LayoutGeometry::uniform((800, 650), 65, 330, 15, &[65]),
            two_row: LayoutGeometry::uniform((700, 800), 50, 292, 15, &[50, 365]),
            three_row: LayoutGeometry::uniform((700, 1100), 50, 292, 15, &[50, 365, 680]),
            caption_margin: default_caption_margin(),
        }
    }
}

impl LayoutTable {
    /// Load a table from JSON and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ModelError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let table: LayoutTable =
            serde_json::from_str(&json).map_err(|e| ModelError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
        table.validate()?;
        Ok(table)
    }

    pub fn geometry(&self, kind: LayoutKind) -> &LayoutGeometry {
        match kind {
            LayoutKind::Single => &self.single,
            LayoutKind::TwoRow => &self.two_row,
            LayoutKind::ThreeRow => &self.three_row,
        }
    }

    pub fn slot(&self, kind: LayoutKind, index: usize) -> Option<ShotSlot> {
        self.geometry(kind).slot(index)
    }

    /// Check every layout: row count matches the shot count, squares stay
    /// inside the canvas and above the caption band, and no two squares
    /// overlap.
    pub fn validate(&self) -> Result<(), ModelError> {
        for kind in LayoutKind::ALL {
            let geometry = self.geometry(kind);
            let invalid = |message: String| ModelError::InvalidGeometry {
                message: format!("{kind}: {message}"),
            };

            if geometry.rows.len() != kind.shot_count() {
                return Err(invalid(format!(
                    "expected {} rows, found {}",
                    kind.shot_count(),
                    geometry.rows.len()
                )));
            }

            for (index, row) in geometry.rows.iter().enumerate() {
                let far_right = row
                    .size
                    .checked_mul(2)
                    .and_then(|w| w.checked_add(geometry.pair_gap))
                    .and_then(|w| w.checked_add(row.x));
                if far_right.is_none() || row.y.checked_add(row.size).is_none() {
                    return Err(invalid(format!("row {index} extends past u32 pixel range")));
                }
            }

            let caption_limit = geometry.canvas_height.saturating_sub(self.caption_margin);
            let squares: Vec<(usize, &str, SquareRect)> = geometry
                .slots()
                .into_iter()
                .flat_map(|s| [(s.index, "left", s.left), (s.index, "right", s.right)])
                .collect();

            for (index, side, square) in &squares {
                if square.size == 0 {
                    return Err(invalid(format!("row {index} has zero size")));
                }
                if !square.fits_within(geometry.canvas_width, geometry.canvas_height) {
                    return Err(invalid(format!(
                        "row {index} {side} square {square:?} exceeds {}x{} canvas",
                        geometry.canvas_width, geometry.canvas_height
                    )));
                }
                if square.bottom() > caption_limit {
                    return Err(invalid(format!(
                        "row {index} {side} square reaches into the caption band"
                    )));
                }
            }

            for (i, (ia, sa, a)) in squares.iter().enumerate() {
                for (ib, sb, b) in squares.iter().skip(i + 1) {
                    if a.overlaps(b) {
                        return Err(invalid(format!(
                            "row {ia} {sa} square overlaps row {ib} {sb} square"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
