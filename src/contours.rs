// src/contours.rs
//
// Contour extraction over the refined mask.
//
// Border following is done by imageproc (Suzuki-Abe). On top of that this
// module:
//   - treats the 1-pixel image frame as background,
//   - reduces the hierarchy to two levels (outer borders and their holes),
//   - compresses straight runs down to their end points.

use crate::types::Mask;
use imageproc::contours::BorderType;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BorderKind {
    Outer,
    Hole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    pub points: Vec<Point>,
    pub kind: BorderKind,
}

impl Contour {
    /// First listed boundary point; used as the position proxy.
    pub fn anchor(&self) -> Option<Point> {
        self.points.first().copied()
    }
}

/// Links between contours, by index into `ContourSet::contours`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HierarchyEntry {
    pub next: Option<usize>,
    pub first_child: Option<usize>,
    pub parent: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ContourSet {
    pub contours: Vec<Contour>,
    pub hierarchy: Vec<HierarchyEntry>,
}

impl ContourSet {
    /// Zero contours: the ball is not in view.
    pub fn is_empty(&self) -> bool {
        self.hierarchy.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contours.len()
    }

    /// Indices of the top-level entries, in listed order.
    #[cfg(test)]
    pub fn roots(&self) -> Vec<usize> {
        let mut out = Vec::new();
        let mut cursor = (!self.hierarchy.is_empty()).then_some(0);
        while let Some(idx) = cursor {
            out.push(idx);
            cursor = self.hierarchy[idx].next;
        }
        out
    }

    /// Holes directly inside contour `idx`.
    #[cfg(test)]
    pub fn children(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut cursor = self.hierarchy.get(idx).and_then(|h| h.first_child);
        while let Some(child) = cursor {
            out.push(child);
            cursor = self.hierarchy[child].next;
        }
        out
    }
}

/// Find outer borders and their holes.
///
/// Listing order follows the border tree, not the scan: every new border is
/// pushed to the front of its level, then the tree is walked depth first.
/// Sibling outer borders therefore come out last-found first, each followed
/// by its holes.
pub fn find_contours(mask: &Mask) -> ContourSet {
    if mask.width < 3 || mask.height < 3 {
        return ContourSet::default();
    }

    let mut image = mask.to_gray_image();
    clear_frame_border(&mut image);

    let raw = imageproc::contours::find_contours::<i32>(&image);
    if raw.is_empty() {
        return ContourSet::default();
    }

    // Two-level parents: a hole hangs off the nearest enclosing outer border,
    // every outer border is top level.
    let parents: Vec<Option<usize>> = raw
        .iter()
        .map(|c| match c.border_type {
            BorderType::Outer => None,
            BorderType::Hole => {
                let mut cursor = c.parent;
                while let Some(p) = cursor {
                    if matches!(raw[p].border_type, BorderType::Outer) {
                        break;
                    }
                    cursor = raw[p].parent;
                }
                cursor
            }
        })
        .collect();

    let (tree, first_root) = build_tree(&parents);
    let order = walk_tree(&tree, first_root);

    let mut position = vec![0usize; raw.len()];
    for (pos, &idx) in order.iter().enumerate() {
        position[idx] = pos;
    }

    let contours = order
        .iter()
        .map(|&idx| {
            let c = &raw[idx];
            Contour {
                points: compress_chain(
                    &c.points
                        .iter()
                        .map(|p| Point::new(p.x, p.y))
                        .collect::<Vec<_>>(),
                ),
                kind: match c.border_type {
                    BorderType::Outer => BorderKind::Outer,
                    BorderType::Hole => BorderKind::Hole,
                },
            }
        })
        .collect();

    let hierarchy = order
        .iter()
        .map(|&idx| {
            let entry = tree[idx];
            HierarchyEntry {
                next: entry.next.map(|i| position[i]),
                first_child: entry.first_child.map(|i| position[i]),
                parent: entry.parent.map(|i| position[i]),
            }
        })
        .collect();

    ContourSet {
        contours,
        hierarchy,
    }
}

fn clear_frame_border(image: &mut image::GrayImage) {
    let (w, h) = image.dimensions();
    for x in 0..w {
        image.put_pixel(x, 0, image::Luma([0]));
        image.put_pixel(x, h - 1, image::Luma([0]));
    }
    for y in 0..h {
        image.put_pixel(0, y, image::Luma([0]));
        image.put_pixel(w - 1, y, image::Luma([0]));
    }
}

/// Link borders in discovery order, inserting each at the head of its
/// parent's child list (or of the top level). Indices are discovery indices.
fn build_tree(parents: &[Option<usize>]) -> (Vec<HierarchyEntry>, Option<usize>) {
    let mut tree = vec![HierarchyEntry::default(); parents.len()];
    let mut first_root: Option<usize> = None;

    for (i, &parent) in parents.iter().enumerate() {
        tree[i].parent = parent;
        match parent {
            Some(p) => {
                tree[i].next = tree[p].first_child.replace(i);
            }
            None => {
                tree[i].next = first_root.replace(i);
            }
        }
    }

    (tree, first_root)
}

/// Depth-first listing: a node, then its children, then its next sibling.
fn walk_tree(tree: &[HierarchyEntry], first_root: Option<usize>) -> Vec<usize> {
    let mut order = Vec::with_capacity(tree.len());
    let mut stack: Vec<usize> = first_root.into_iter().collect();

    while let Some(idx) = stack.pop() {
        order.push(idx);
        if let Some(next) = tree[idx].next {
            stack.push(next);
        }
        if let Some(child) = tree[idx].first_child {
            stack.push(child);
        }
    }
    order
}

/// Keep only the points where the chain changes direction. The start point
/// is always kept so the anchor stays the border's first pixel.
pub fn compress_chain(points: &[Point]) -> Vec<Point> {
    let n = points.len();
    if n <= 2 {
        return points.to_vec();
    }

    let step = |a: Point, b: Point| ((b.x - a.x).signum(), (b.y - a.y).signum());

    let mut out = Vec::with_capacity(n);
    out.push(points[0]);
    for i in 1..n {
        let prev = points[i - 1];
        let cur = points[i];
        let next = points[(i + 1) % n];
        if step(prev, cur) != step(cur, next) {
            out.push(cur);
        }
    }
    out
}
