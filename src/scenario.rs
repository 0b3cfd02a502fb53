use crate::sample::{GRAVITY, RawSample};
use std::f32::consts::TAU;

/// Device orientation used for synthetic streams: slightly tilted, unit length.
const TILT: [f32; 3] = [0.1, 0.2, 0.974_679_4];

const LEAD_IN: usize = 100;
const SETTLE: usize = 150;

/// Deterministic synthetic motion streams for exercising the engine offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Scenario {
    /// Device lying still.
    Rest,
    /// Steady gait with a 550ms stride.
    Walk,
    /// Rest, free-fall, a hard landing, then lying still.
    Fall,
    /// Device set down hard on a table: a short dip and a knock, then still.
    TableDrop,
    /// Walking with a single sharp knock against the device.
    PocketBump,
}

impl Scenario {
    pub const ALL: [Scenario; 5] = [
        Scenario::Rest,
        Scenario::Walk,
        Scenario::Fall,
        Scenario::TableDrop,
        Scenario::PocketBump,
    ];

    /// Number of falls a correctly tuned engine reports for this stream.
    pub fn expected_falls(self) -> usize {
        match self {
            Scenario::Fall => 1,
            _ => 0,
        }
    }

    /// Magnitude of every sample, oldest first.
    pub fn magnitudes(self) -> Vec<f32> {
        match self {
            Scenario::Rest => rest(250),
            Scenario::Walk => walk(400),
            Scenario::Fall => {
                let mut m = rest(LEAD_IN);
                m.extend([2.0; 8]);
                m.extend([35.0; 5]);
                m.extend([GRAVITY; SETTLE]);
                m
            }
            Scenario::TableDrop => {
                let mut m = rest(LEAD_IN);
                m.extend([7.5, 5.0, 4.5, 5.5, 16.0, 12.0, 10.5]);
                m.extend(rest(SETTLE));
                m
            }
            Scenario::PocketBump => {
                let mut m = walk(400);
                m[200] = 32.0;
                m[201] = 18.0;
                m
            }
        }
    }

    /// The stream as raw driver readings, one every `interval_ms` starting at `interval_ms`.
    pub fn samples(self, interval_ms: i64) -> Vec<RawSample> {
        self.magnitudes()
            .into_iter()
            .enumerate()
            .map(|(i, m)| {
                RawSample::new(m * TILT[0], m * TILT[1], m * TILT[2], (i as i64 + 1) * interval_ms)
            })
            .collect()
    }
}

fn rest(n: usize) -> Vec<f32> {
    (0..n).map(|i| GRAVITY + 0.08 * (i as f32 * 0.7).sin()).collect()
}

fn walk(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let stride = (TAU * i as f32 * 20.0 / 550.0).sin();
            GRAVITY + 3.5 * stride + 0.4 * (i as f32 * 1.3).sin()
        })
        .collect()
}
