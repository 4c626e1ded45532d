//! 2D affine matrices for the `cm` operator.

use lopdf::Object;

use super::bbox::BBox;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix2D {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix2D {
    #[cfg(test)]
    pub fn identity() -> Self {
        Self::from_array([1.0, 0.0, 0.0, 1.0, 0.0, 0.0])
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self::from_array([sx, 0.0, 0.0, sy, 0.0, 0.0])
    }

    pub fn translate(tx: f32, ty: f32) -> Self {
        Self::from_array([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// Matrix mapping the image unit square onto `rect`.
    pub fn image_placement(rect: BBox) -> Self {
        Self::translate(rect.min_x, rect.min_y).multiply(Self::scale(rect.width(), rect.height()))
    }

    /// `self × other`: `other` is applied first.
    pub fn multiply(self, other: Self) -> Self {
        Self {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    #[cfg(test)]
    pub fn apply(self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    pub fn from_array(values: [f32; 6]) -> Self {
        Self {
            a: values[0],
            b: values[1],
            c: values[2],
            d: values[3],
            e: values[4],
            f: values[5],
        }
    }

    pub fn to_array(self) -> [f32; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// Operands for a `cm` operation.
    pub fn to_operands(self) -> Vec<Object> {
        self.to_array().into_iter().map(Object::Real).collect()
    }
}
