use std::collections::BTreeMap;

use opencv::{
    core::{BORDER_CONSTANT, CV_8UC1, Point, Rect, Scalar, Vector},
    imgproc::{
        CHAIN_APPROX_SIMPLE, COLOR_BGR2HSV, FONT_HERSHEY_SIMPLEX, LINE_8, MORPH_CLOSE, MORPH_OPEN,
        RETR_EXTERNAL,
    },
    prelude::*,
};

use crate::vision::{ColourDefinition, DetectionResult};

/// A connected blob that survived thresholding, cleanup and the area filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub bounds: Rect,
    pub area: f64,
}

impl Region {
    /// Outline corners, the bottom-right one sits just past the last pixel
    pub fn corners(&self) -> (Point, Point) {
        let Rect {
            x,
            y,
            width,
            height,
        } = self.bounds;
        (Point::new(x, y), Point::new(x + width, y + height))
    }
}

pub struct ColourDetector {
    min_area: f64,
}

impl ColourDetector {
    pub const KERNEL_SIZE: i32 = 5;
    pub const DEFAULT_MIN_AREA: f64 = 500.0;
    const STROKE: i32 = 2;
    const LABEL_OFFSET: i32 = 10;
    const LABEL_SCALE: f64 = 0.6;
    const SUMMARY_X: i32 = 10;
    const SUMMARY_Y: i32 = 30;
    const SUMMARY_SCALE: f64 = 0.7;

    pub fn new(min_area: f64) -> Self {
        Self { min_area }
    }

    /// Annotate a copy of `frame` with every region of every colour and count
    /// them. Masks are always taken from the untouched input.
    pub fn process(
        &self,
        frame: &Mat,
        colours: &[ColourDefinition],
    ) -> opencv::Result<DetectionResult> {
        let mut annotated = frame.try_clone()?;
        let hsv = Self::to_hsv(frame)?;
        let mut counts = BTreeMap::new();
        let mut summary = Vec::with_capacity(colours.len());

        for colour in colours {
            let regions = self.regions_in_hsv(&hsv, colour)?;
            for region in &regions {
                Self::draw_region(&mut annotated, region, colour)?;
            }
            let count = regions.len() as u32;
            summary.push(format!("{}: {}", colour.title(), count));
            counts.insert(colour.name.clone(), count);
        }

        opencv::imgproc::put_text(
            &mut annotated,
            &summary.join(" | "),
            Point::new(Self::SUMMARY_X, Self::SUMMARY_Y),
            FONT_HERSHEY_SIMPLEX,
            Self::SUMMARY_SCALE,
            Scalar::all(255.0),
            Self::STROKE,
            LINE_8,
            false,
        )?;

        Ok(DetectionResult { annotated, counts })
    }

    pub fn find_regions(
        &self,
        frame: &Mat,
        colour: &ColourDefinition,
    ) -> opencv::Result<Vec<Region>> {
        let hsv = Self::to_hsv(frame)?;
        self.regions_in_hsv(&hsv, colour)
    }

    fn to_hsv(frame: &Mat) -> opencv::Result<Mat> {
        let mut hsv = Mat::default();
        opencv::imgproc::cvt_color_def(frame, &mut hsv, COLOR_BGR2HSV)?;
        Ok(hsv)
    }

    fn regions_in_hsv(
        &self,
        hsv: &Mat,
        colour: &ColourDefinition,
    ) -> opencv::Result<Vec<Region>> {
        let mask = Self::cleaned_mask(hsv, colour)?;

        let mut contours: Vector<Vector<Point>> = Vector::new();
        opencv::imgproc::find_contours_def(
            &mask,
            &mut contours,
            RETR_EXTERNAL,
            CHAIN_APPROX_SIMPLE,
        )?;

        let mut regions = Vec::new();
        for contour in contours.iter() {
            let area = opencv::imgproc::contour_area_def(&contour)?;
            if area > self.min_area {
                regions.push(Region {
                    bounds: opencv::imgproc::bounding_rect(&contour)?,
                    area,
                });
            }
        }
        Ok(regions)
    }

    // Union of all ranges, then open + close with a fixed 5x5 kernel
    fn cleaned_mask(hsv: &Mat, colour: &ColourDefinition) -> opencv::Result<Mat> {
        let mut mask =
            Mat::new_rows_cols_with_default(hsv.rows(), hsv.cols(), CV_8UC1, Scalar::all(0.0))?;
        for range in &colour.ranges {
            let lower = Vector::from_slice(&[
                f64::from(range.lower[0]),
                f64::from(range.lower[1]),
                f64::from(range.lower[2]),
            ]);
            let upper = Vector::from_slice(&[
                f64::from(range.upper[0]),
                f64::from(range.upper[1]),
                f64::from(range.upper[2]),
            ]);
            let mut range_mask = Mat::default();
            opencv::core::in_range(hsv, &lower, &upper, &mut range_mask)?;
            let mut combined = Mat::default();
            opencv::core::bitwise_or_def(&mask, &range_mask, &mut combined)?;
            mask = combined;
        }

        let kernel = Mat::new_rows_cols_with_default(
            Self::KERNEL_SIZE,
            Self::KERNEL_SIZE,
            CV_8UC1,
            Scalar::all(1.0),
        )?;
        let mut opened = Mat::default();
        Self::morph(&mask, &mut opened, MORPH_OPEN, &kernel)?;
        let mut closed = Mat::default();
        Self::morph(&opened, &mut closed, MORPH_CLOSE, &kernel)?;
        Ok(closed)
    }

    fn morph(src: &Mat, dst: &mut Mat, op: i32, kernel: &Mat) -> opencv::Result<()> {
        opencv::imgproc::morphology_ex(
            src,
            dst,
            op,
            kernel,
            Point::new(-1, -1),
            1,
            BORDER_CONSTANT,
            opencv::imgproc::morphology_default_border_value()?,
        )
    }

    fn draw_region(
        frame: &mut Mat,
        region: &Region,
        colour: &ColourDefinition,
    ) -> opencv::Result<()> {
        let display = colour.display_scalar();
        let (top_left, bottom_right) = region.corners();
        opencv::imgproc::rectangle_points(
            frame,
            top_left,
            bottom_right,
            display,
            Self::STROKE,
            LINE_8,
            0,
        )?;

        let label = format!("{}: {}", colour.name.to_uppercase(), region.area as i64);
        let origin = Point::new(region.bounds.x, region.bounds.y - Self::LABEL_OFFSET);
        opencv::imgproc::put_text(
            frame,
            &label,
            origin,
            FONT_HERSHEY_SIMPLEX,
            Self::LABEL_SCALE,
            display,
            Self::STROKE,
            LINE_8,
            false,
        )
    }
}

impl Default for ColourDetector {
    fn default() -> Self {
        ColourDetector::new(Self::DEFAULT_MIN_AREA)
    }
}
