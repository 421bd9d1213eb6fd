//! Lock-free moving average.
//!
//! Request threads update averages concurrently. Updates are applied with a
//! compare-and-swap loop on the `f64` bit pattern, so no sample is lost, but
//! concurrent samples may be applied in any order.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct AtomicMovingAverage {
    bits: AtomicU64,
    samples: AtomicU64,
    window: u64,
}

impl AtomicMovingAverage {
    /// `window` is the number of recent samples that dominate the average.
    pub fn new(window: u64) -> Self {
        Self {
            bits: AtomicU64::new(0f64.to_bits()),
            samples: AtomicU64::new(0),
            window: window.max(1),
        }
    }

    pub fn update(&self, value: f64) {
        let n = self.samples.fetch_add(1, Ordering::Relaxed) + 1;
        let weight = 1.0 / n.min(self.window) as f64;
        let _ = self.bits.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
            let old = f64::from_bits(bits);
            Some((old + (value - old) * weight).to_bits())
        });
    }

    pub fn average(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_of_first_window_is_exact() {
        let avg = AtomicMovingAverage::new(100);
        for v in [2.0, 4.0, 6.0] {
            avg.update(v);
        }
        assert!((avg.average() - 4.0).abs() < 1e-9);
        assert_eq!(avg.samples(), 3);
    }

    #[test]
    fn test_average_tracks_recent_values() {
        let avg = AtomicMovingAverage::new(10);
        for _ in 0..100 {
            avg.update(1.0);
        }
        for _ in 0..200 {
            avg.update(50.0);
        }
        assert!(avg.average() > 49.0);
    }

    #[test]
    fn test_concurrent_updates() {
        let avg = std::sync::Arc::new(AtomicMovingAverage::new(1_000_000));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let avg = avg.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        avg.update(3.0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(avg.samples(), 4000);
        assert!((avg.average() - 3.0).abs() < 1e-6);
    }
}
