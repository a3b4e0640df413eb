use glam::DVec3;

/// One of the three world axes.
///
/// The ordinal (`X = 0`, `Y = 1`, `Z = 2`) indexes per-axis arrays such as
/// piston delta accumulators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes in ordinal order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Array index of this axis.
    pub fn ordinal(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Picks the value that belongs to this axis.
    pub fn choose<T>(self, x: T, y: T, z: T) -> T {
        match self {
            Axis::X => x,
            Axis::Y => y,
            Axis::Z => z,
        }
    }

    /// Reads this axis' component from a vector.
    pub fn of(self, v: DVec3) -> f64 {
        self.choose(v.x, v.y, v.z)
    }

    /// Unit-length vector along this axis scaled by `amount`.
    pub fn vector(self, amount: f64) -> DVec3 {
        match self {
            Axis::X => DVec3::new(amount, 0.0, 0.0),
            Axis::Y => DVec3::new(0.0, amount, 0.0),
            Axis::Z => DVec3::new(0.0, 0.0, amount),
        }
    }

    /// The two axes perpendicular to this one, in ordinal order.
    pub fn others(self) -> (Axis, Axis) {
        match self {
            Axis::X => (Axis::Y, Axis::Z),
            Axis::Y => (Axis::X, Axis::Z),
            Axis::Z => (Axis::X, Axis::Y),
        }
    }
}
