/// Area under the ROC curve via the Mann-Whitney rank statistic, with
/// average ranks over tied scores. Returns `None` when the labels are all
/// positive or all negative, where AUC is undefined.
pub fn roc_auc(scores: &[f32], labels: &[f32]) -> Option<f64> {
    debug_assert_eq!(scores.len(), labels.len());

    let n = scores.len();
    let positives = labels.iter().filter(|&&y| y > 0.5).count();
    let negatives = n - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut rank_sum_pos = 0.0f64;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // 1-based average rank shared by the tie group [i, j]
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if labels[idx] > 0.5 {
                rank_sum_pos += avg_rank;
            }
        }
        i = j + 1;
    }

    let p = positives as f64;
    let q = negatives as f64;
    Some((rank_sum_pos - p * (p + 1.0) / 2.0) / (p * q))
}

/// Accumulates predictions across the batches of an epoch and reports a
/// single AUC over all of them.
#[derive(Debug, Default)]
pub struct AucMetric {
    scores: Vec<f32>,
    labels: Vec<f32>,
}

impl AucMetric {
    pub fn update(&mut self, scores: &[f32], labels: &[f32]) {
        self.scores.extend_from_slice(scores);
        self.labels.extend_from_slice(labels);
    }

    pub fn value(&self) -> Option<f64> {
        roc_auc(&self.scores, &self.labels)
    }

    pub fn reset(&mut self) {
        self.scores.clear();
        self.labels.clear();
    }
}
