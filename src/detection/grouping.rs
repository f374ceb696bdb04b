use crate::pipeline::BoundingBox;

/// Relative tolerance used when merging raw cascade hits.
pub const GROUP_EPS: f64 = 0.2;

fn similar(a: &BoundingBox, b: &BoundingBox, eps: f64) -> bool {
    let delta = eps * (a.width.min(b.width) + a.height.min(b.height)) as f64 * 0.5;
    ((a.x - b.x).abs() as f64) <= delta
        && ((a.y - b.y).abs() as f64) <= delta
        && ((a.right() - b.right()).abs() as f64) <= delta
        && ((a.bottom() - b.bottom()).abs() as f64) <= delta
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Label each rectangle with its equivalence class under `similar`, closed
/// transitively. Labels are numbered in order of first appearance.
fn partition(rects: &[BoundingBox], eps: f64) -> (Vec<usize>, usize) {
    let mut parent: Vec<usize> = (0..rects.len()).collect();
    for i in 0..rects.len() {
        for j in 0..i {
            if similar(&rects[i], &rects[j], eps) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[ri] = rj;
                }
            }
        }
    }

    let mut root_label: Vec<Option<usize>> = vec![None; rects.len()];
    let mut labels = Vec::with_capacity(rects.len());
    let mut n_classes = 0;
    for i in 0..rects.len() {
        let root = find(&mut parent, i);
        let label = *root_label[root].get_or_insert_with(|| {
            n_classes += 1;
            n_classes - 1
        });
        labels.push(label);
    }
    (labels, n_classes)
}

/// Merge overlapping raw detections into one rectangle per object.
///
/// Similar rectangles are clustered and averaged. Clusters with at most
/// `group_threshold` members are dropped, as are clusters lying inside a
/// stronger neighbour. A threshold of zero returns the input untouched.
pub fn group_rectangles(rects: Vec<BoundingBox>, group_threshold: u32, eps: f64) -> Vec<BoundingBox> {
    if group_threshold == 0 || rects.is_empty() {
        return rects;
    }

    let (labels, n_classes) = partition(&rects, eps);

    let mut sums = vec![[0i64; 4]; n_classes];
    let mut counts = vec![0u32; n_classes];
    for (rect, &label) in rects.iter().zip(&labels) {
        let s = &mut sums[label];
        s[0] += rect.x as i64;
        s[1] += rect.y as i64;
        s[2] += rect.width as i64;
        s[3] += rect.height as i64;
        counts[label] += 1;
    }

    let averaged: Vec<BoundingBox> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &n)| {
            let scale = 1.0 / n as f64;
            BoundingBox::new(
                (s[0] as f64 * scale).round() as i32,
                (s[1] as f64 * scale).round() as i32,
                (s[2] as f64 * scale).round() as i32,
                (s[3] as f64 * scale).round() as i32,
            )
        })
        .collect();

    let mut grouped = Vec::new();
    for (i, r1) in averaged.iter().enumerate() {
        let n1 = counts[i];
        if n1 <= group_threshold {
            continue;
        }

        let swallowed = averaged.iter().enumerate().any(|(j, r2)| {
            let n2 = counts[j];
            if j == i || n2 <= group_threshold {
                return false;
            }
            let dx = (r2.width as f64 * eps).round() as i32;
            let dy = (r2.height as f64 * eps).round() as i32;
            r1.x >= r2.x - dx
                && r1.y >= r2.y - dy
                && r1.right() <= r2.right() + dx
                && r1.bottom() <= r2.bottom() + dy
                && (n2 > n1.max(3) || n1 < 3)
        });

        if !swallowed {
            grouped.push(*r1);
        }
    }
    grouped
}
