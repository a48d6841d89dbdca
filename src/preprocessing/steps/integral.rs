use image::GrayImage;

/// Summed-area tables of a grayscale image and of its squared values.
///
/// Both tables are `(width + 1) x (height + 1)` with a zero first row and
/// column, stored flat in `u64` so large windows cannot overflow.
pub struct IntegralImage {
    width: usize,
    height: usize,
    sum: Vec<u64>,
    sum_sq: Option<Vec<u64>>,
}

/// Inclusive-exclusive window bounds clamped to the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub x1: usize,
    pub y1: usize,
    pub x2: usize,
    pub y2: usize,
}

impl Window {
    pub fn area(&self) -> u64 {
        ((self.x2 - self.x1) * (self.y2 - self.y1)) as u64
    }
}

impl IntegralImage {
    /// Sum table only
    pub fn new(img: &GrayImage) -> Self {
        Self::build(img, false)
    }

    /// Sum and squared-sum tables
    pub fn with_squares(img: &GrayImage) -> Self {
        Self::build(img, true)
    }

    fn build(img: &GrayImage, squares: bool) -> Self {
        let width = img.width() as usize;
        let height = img.height() as usize;
        let stride = width + 1;
        let raw = img.as_raw();

        let mut sum = vec![0u64; stride * (height + 1)];
        let mut sum_sq = if squares {
            Some(vec![0u64; stride * (height + 1)])
        } else {
            None
        };

        for y in 0..height {
            let mut row = 0u64;
            let mut row_sq = 0u64;
            for x in 0..width {
                let val = raw[y * width + x] as u64;
                row += val;
                row_sq += val * val;

                let i = (y + 1) * stride + (x + 1);
                sum[i] = sum[i - stride] + row;
                if let Some(sq) = sum_sq.as_mut() {
                    sq[i] = sq[i - stride] + row_sq;
                }
            }
        }

        Self {
            width,
            height,
            sum,
            sum_sq,
        }
    }

    /// Window of radius `r` around (x, y), clipped to the image bounds
    pub fn window(&self, x: usize, y: usize, r: usize) -> Window {
        Window {
            x1: x.saturating_sub(r),
            y1: y.saturating_sub(r),
            x2: (x + r + 1).min(self.width),
            y2: (y + r + 1).min(self.height),
        }
    }

    pub fn sum(&self, w: Window) -> u64 {
        rect_sum(&self.sum, self.width + 1, w)
    }

    /// Sum of squared values; zero when built without squares
    pub fn sum_sq(&self, w: Window) -> u64 {
        self.sum_sq
            .as_deref()
            .map(|table| rect_sum(table, self.width + 1, w))
            .unwrap_or(0)
    }

    /// Mean and standard deviation over a window
    pub fn stats(&self, w: Window) -> (f64, f64) {
        let area = w.area() as f64;
        let mean = self.sum(w) as f64 / area;
        let variance = self.sum_sq(w) as f64 / area - mean * mean;
        (mean, variance.max(0.0).sqrt())
    }
}

fn rect_sum(table: &[u64], stride: usize, w: Window) -> u64 {
    table[w.y2 * stride + w.x2] + table[w.y1 * stride + w.x1]
        - table[w.y1 * stride + w.x2]
        - table[w.y2 * stride + w.x1]
}
