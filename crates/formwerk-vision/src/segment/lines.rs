// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reading order: cluster word boxes into lines, then sort.

use std::collections::VecDeque;

use formwerk_core::BBox;

/// Density-based clustering over an arbitrary distance.
///
/// A point with at least `min_samples` points (itself included) within
/// `eps` is a core point. Clusters grow from core points through their
/// neighbourhoods. Returns a cluster label per point; `None` is noise.
pub fn dbscan(
    n: usize,
    eps: f64,
    min_samples: usize,
    distance: impl Fn(usize, usize) -> f64,
) -> Vec<Option<usize>> {
    let neighbours: Vec<Vec<usize>> = (0..n)
        .map(|i| (0..n).filter(|&j| distance(i, j) <= eps).collect())
        .collect();
    let is_core = |i: usize| neighbours[i].len() >= min_samples;

    let mut labels: Vec<Option<usize>> = vec![None; n];
    let mut next = 0;
    for start in 0..n {
        if labels[start].is_some() || !is_core(start) {
            continue;
        }
        labels[start] = Some(next);
        let mut queue: VecDeque<usize> = VecDeque::from([start]);
        while let Some(p) = queue.pop_front() {
            if !is_core(p) {
                continue;
            }
            for &q in &neighbours[p] {
                if labels[q].is_none() {
                    labels[q] = Some(next);
                    queue.push_back(q);
                }
            }
        }
        next += 1;
    }
    labels
}

/// `1 - IoU` of the two boxes' vertical extents.
pub fn line_distance(a: &BBox, b: &BBox) -> f64 {
    1.0 - a.vertical_iou(b)
}

/// Group boxes into lines and order them for reading.
///
/// Lines run top to bottom by the mean vertical centre of their boxes;
/// boxes within a line run left to right by horizontal centre. Boxes that
/// belong to no line are dropped.
pub fn group_lines(boxes: &[BBox], max_distance: f64, min_words: usize) -> Vec<Vec<BBox>> {
    let labels = dbscan(boxes.len(), max_distance, min_words, |i, j| {
        line_distance(&boxes[i], &boxes[j])
    });

    let count = labels.iter().flatten().max().map_or(0, |m| m + 1);
    let mut lines: Vec<Vec<BBox>> = vec![Vec::new(); count];
    for (bbox, label) in boxes.iter().zip(&labels) {
        if let Some(label) = label {
            lines[*label].push(*bbox);
        }
    }
    lines.retain(|line| !line.is_empty());

    for line in &mut lines {
        line.sort_by(|a, b| a.center_x().total_cmp(&b.center_x()));
    }
    lines.sort_by(|a, b| mean_center_y(a).total_cmp(&mean_center_y(b)));
    lines
}

fn mean_center_y(line: &[BBox]) -> f64 {
    line.iter().map(BBox::center_y).sum::<f64>() / line.len() as f64
}
