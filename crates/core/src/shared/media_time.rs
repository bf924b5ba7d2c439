use std::cmp::Ordering;
use std::fmt;
use std::ops::Sub;

/// Presentation timestamp expressed as the rational `value / timescale` seconds.
///
/// Comparison and subtraction are exact: two timestamps with different
/// timescales are compared by cross-multiplication, never through floats.
#[derive(Clone, Copy, Debug)]
pub struct MediaTime {
    value: i64,
    timescale: u32,
}

impl MediaTime {
    pub const ZERO: MediaTime = MediaTime {
        value: 0,
        timescale: 1,
    };

    /// A zero `timescale` is coerced to 1.
    pub fn new(value: i64, timescale: u32) -> Self {
        Self {
            value,
            timescale: timescale.max(1),
        }
    }

    /// Duration of one frame at `fps`, or `None` when `fps` is zero.
    pub fn from_frame_rate(fps: u32) -> Option<Self> {
        (fps > 0).then(|| Self::new(1, fps))
    }

    pub fn from_secs_f64(secs: f64, timescale: u32) -> Self {
        let timescale = timescale.max(1);
        Self::new((secs * timescale as f64).round() as i64, timescale)
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn timescale(&self) -> u32 {
        self.timescale
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.value as f64 / self.timescale as f64
    }

    /// True when `self - since >= span`, decided without rounding.
    ///
    /// Falls back to the reduced difference only when the exact products
    /// overflow `i128`.
    pub fn has_elapsed(&self, since: MediaTime, span: MediaTime) -> bool {
        let (lhs, rhs) = self.cross(&since);
        let scales = self.timescale as i128 * since.timescale as i128;
        let exact = (lhs - rhs)
            .checked_mul(span.timescale as i128)
            .zip((span.value as i128).checked_mul(scales));
        match exact {
            Some((elapsed, required)) => elapsed >= required,
            None => *self - since >= span,
        }
    }

    fn cross(&self, other: &MediaTime) -> (i128, i128) {
        (
            self.value as i128 * other.timescale as i128,
            other.value as i128 * self.timescale as i128,
        )
    }
}

impl Default for MediaTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for MediaTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MediaTime {}

impl PartialOrd for MediaTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MediaTime {
    fn cmp(&self, other: &Self) -> Ordering {
        let (lhs, rhs) = self.cross(other);
        lhs.cmp(&rhs)
    }
}

impl Sub for MediaTime {
    type Output = MediaTime;

    /// Exact difference, reduced by the gcd of numerator and denominator.
    /// Saturates at the `i64` / `u32` bounds for pathological timescales.
    fn sub(self, rhs: MediaTime) -> MediaTime {
        let (lhs, rhs_scaled) = self.cross(&rhs);
        let mut numerator = lhs - rhs_scaled;
        let mut denominator = self.timescale as i128 * rhs.timescale as i128;

        let divisor = gcd(numerator.unsigned_abs(), denominator.unsigned_abs()) as i128;
        if divisor > 1 {
            numerator /= divisor;
            denominator /= divisor;
        }

        while denominator > u32::MAX as i128 {
            numerator /= 2;
            denominator /= 2;
        }

        let value = numerator.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        MediaTime::new(value, denominator as u32)
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}
