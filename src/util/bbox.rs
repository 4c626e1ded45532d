/// Axis-aligned rectangle in PDF user space (origin bottom-left).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BBox {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl BBox {
    pub fn from_origin_size(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x + width,
            max_y: y + height,
        }
    }

    /// Rectangle of `width × height` whose top-left corner sits at
    /// (`x`, `top`).
    pub fn hanging_from(x: f32, top: f32, width: f32, height: f32) -> Self {
        Self::from_origin_size(x, top - height, width, height)
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hanging_rect_extends_downwards() {
        let rect = BBox::hanging_from(10.0, 100.0, 30.0, 40.0);
        assert_eq!(rect.to_array(), [10.0, 60.0, 40.0, 100.0]);
        assert_eq!(rect.width(), 30.0);
        assert_eq!(rect.height(), 40.0);
    }
}
