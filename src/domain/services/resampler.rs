//! Series Resampler
//!
//! Pure domain logic for compressing a long time series into a bounded
//! number of chart points. No I/O, no allocation beyond the output.

use crate::domain::entities::DataPoint;

/// Running sums for the bucket currently being filled.
#[derive(Debug, Default)]
struct Bucket {
    count: usize,
    sum_xy: f64,
    sum_y: f64,
}

impl Bucket {
    fn add(&mut self, point: &DataPoint) {
        self.count += 1;
        self.sum_xy += point.x * point.y;
        self.sum_y += point.y;
    }

    /// Collapse the bucket into one point.
    ///
    /// x is the y-weighted centroid `sum(x*y) / sum(y)`; only when the
    /// y values sum to zero does it fall back to the bucket midpoint.
    fn flush(&self, upper: f64, step: f64) -> Option<DataPoint> {
        if self.count == 0 {
            return None;
        }
        let x = if self.sum_y != 0.0 {
            self.sum_xy / self.sum_y
        } else {
            upper - step / 2.0
        };
        Some(DataPoint::new(x, self.sum_y / self.count as f64))
    }
}

/// Reduce an ascending series to at most `limit` averaged points.
///
/// - `limit >= series.len()` returns the series unchanged.
/// - `limit < 1` returns a single point at the midpoint of the x range
///   with the mean of all y values.
/// - Otherwise the x range is cut into `limit` equal-width buckets and each
///   non-empty bucket becomes one point (see [`Bucket::flush`]). Empty
///   buckets produce nothing.
///
/// The last bucket boundary is pinned to the final x value so rounding in
/// the step arithmetic can never open an extra bucket.
pub fn resample(series: &[DataPoint], limit: i64) -> Vec<DataPoint> {
    if limit >= series.len() as i64 {
        return series.to_vec();
    }

    let (first, last) = match (series.first(), series.last()) {
        (Some(first), Some(last)) => (first.x, last.x),
        _ => return Vec::new(),
    };

    if limit < 1 {
        let mean = series.iter().map(|p| p.y).sum::<f64>() / series.len() as f64;
        return vec![DataPoint::new((first + last) / 2.0, mean)];
    }

    let buckets = limit as usize;
    let step = (last - first) / limit as f64;
    let boundary = |k: usize| {
        if k >= buckets {
            last
        } else {
            first + step * k as f64
        }
    };

    let mut result = Vec::with_capacity(buckets);
    let mut k = 1;
    let mut upper = boundary(k);
    let mut bucket = Bucket::default();

    for point in series {
        if point.x > upper {
            result.extend(bucket.flush(upper, step));
            while point.x > upper && k < buckets {
                k += 1;
                upper = boundary(k);
            }
            bucket = Bucket::default();
        }
        bucket.add(point);
    }
    result.extend(bucket.flush(upper, step));

    result
}
