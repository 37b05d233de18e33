//! Steps transforming bounding boxes, points, and raw detection output.

use konduit_core::{
    BoundingBox, Data, NDArray, PipelineError, PipelineStepRunner, Point, StepConfig, Value,
    ValueType,
};

/// Which point of a box to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CornerMethod {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    #[default]
    Center,
}

impl CornerMethod {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "top_left" => Some(CornerMethod::TopLeft),
            "top_right" => Some(CornerMethod::TopRight),
            "bottom_left" => Some(CornerMethod::BottomLeft),
            "bottom_right" => Some(CornerMethod::BottomRight),
            "center" => Some(CornerMethod::Center),
            _ => None,
        }
    }

    fn apply(self, bbox: &BoundingBox) -> Point {
        let (left, right) = (bbox.x1.min(bbox.x2), bbox.x1.max(bbox.x2));
        let (top, bottom) = (bbox.y1.min(bbox.y2), bbox.y1.max(bbox.y2));
        let (x, y) = match self {
            CornerMethod::TopLeft => (left, top),
            CornerMethod::TopRight => (right, top),
            CornerMethod::BottomLeft => (left, bottom),
            CornerMethod::BottomRight => (right, bottom),
            CornerMethod::Center => (bbox.cx(), bbox.cy()),
        };
        let mut point = Point::new(x, y);
        point.label = bbox.label.clone();
        point.probability = bbox.probability;
        point
    }
}

/// Extracts a representative point from a bounding box (or each box of a
/// list), keeping label and probability.
///
/// Options: `input_name` (default `bbox`), `output_name` (default
/// `point`), `method` (default `center`).
#[derive(Debug)]
pub struct BboxToPointRunner {
    input_name: String,
    output_name: String,
    method: CornerMethod,
}

impl BboxToPointRunner {
    pub fn from_config(config: &StepConfig) -> Result<Self, PipelineError> {
        let method = match config.option_str("method") {
            None => CornerMethod::default(),
            Some(name) => CornerMethod::parse(name).ok_or_else(|| PipelineError::RunnerInit {
                step_type: config.step_type.clone(),
                reason: format!("unknown method {:?}", name),
            })?,
        };
        Ok(Self {
            input_name: config.option_str("input_name").unwrap_or("bbox").to_string(),
            output_name: config.option_str("output_name").unwrap_or("point").to_string(),
            method,
        })
    }
}

impl PipelineStepRunner for BboxToPointRunner {
    fn exec(&mut self, mut input: Data) -> Result<Data, PipelineError> {
        let output = match input.get(&self.input_name) {
            Some(Value::BoundingBox(bbox)) => Value::Point(self.method.apply(bbox)),
            Some(Value::List(ValueType::BoundingBox, items)) => {
                let points = items
                    .iter()
                    .map(|item| match item {
                        Value::BoundingBox(bbox) => Value::Point(self.method.apply(bbox)),
                        other => other.clone(),
                    })
                    .collect();
                Value::List(ValueType::Point, points)
            }
            _ => {
                return Err(PipelineError::Exec(format!(
                    "key {:?} holds no bounding box",
                    self.input_name
                )));
            }
        };
        input.insert(self.output_name.clone(), output)?;
        Ok(input)
    }
}

/// Expands a point (or each point of a list) into a fixed-size bounding
/// box centered on it, keeping label and probability.
///
/// Options: `input_name` (default `point`), `output_name` (default
/// `bbox`), required `width` and `height`.
#[derive(Debug)]
pub struct PointToBboxRunner {
    input_name: String,
    output_name: String,
    width: f64,
    height: f64,
}

impl PointToBboxRunner {
    pub fn from_config(config: &StepConfig) -> Result<Self, PipelineError> {
        let require = |key: &str| {
            config.option_f64(key).ok_or_else(|| PipelineError::RunnerInit {
                step_type: config.step_type.clone(),
                reason: format!("missing {} option", key),
            })
        };
        Ok(Self {
            input_name: config.option_str("input_name").unwrap_or("point").to_string(),
            output_name: config.option_str("output_name").unwrap_or("bbox").to_string(),
            width: require("width")?,
            height: require("height")?,
        })
    }

    fn expand(&self, point: &Point) -> BoundingBox {
        let mut bbox = BoundingBox::from_center(point.x, point.y, self.width, self.height);
        bbox.label = point.label.clone();
        bbox.probability = point.probability;
        bbox
    }
}

impl PipelineStepRunner for PointToBboxRunner {
    fn exec(&mut self, mut input: Data) -> Result<Data, PipelineError> {
        let output = match input.get(&self.input_name) {
            Some(Value::Point(point)) => Value::BoundingBox(self.expand(point)),
            Some(Value::List(ValueType::Point, items)) => {
                let boxes = items
                    .iter()
                    .map(|item| match item {
                        Value::Point(point) => Value::BoundingBox(self.expand(point)),
                        other => other.clone(),
                    })
                    .collect();
                Value::List(ValueType::BoundingBox, boxes)
            }
            _ => {
                return Err(PipelineError::Exec(format!(
                    "key {:?} holds no point",
                    self.input_name
                )));
            }
        };
        input.insert(self.output_name.clone(), output)?;
        Ok(input)
    }
}

/// Turns raw single-shot detector output into a list of bounding boxes.
///
/// Expects a rank-2 f32 array whose rows are `[x1, y1, x2, y2, score]`.
/// Rows scoring below `threshold` (default 0.5) are dropped.
///
/// Options: `input_name` (default `detections`), `output_name` (default
/// `bounding_boxes`), `threshold`.
pub struct SsdToBboxRunner {
    input_name: String,
    output_name: String,
    threshold: f64,
}

impl SsdToBboxRunner {
    pub fn from_config(config: &StepConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            input_name: config
                .option_str("input_name")
                .unwrap_or("detections")
                .to_string(),
            output_name: config
                .option_str("output_name")
                .unwrap_or("bounding_boxes")
                .to_string(),
            threshold: config.option_f64("threshold").unwrap_or(0.5),
        })
    }
}

impl PipelineStepRunner for SsdToBboxRunner {
    fn exec(&mut self, mut input: Data) -> Result<Data, PipelineError> {
        let array = input
            .get_ndarray(&self.input_name)
            .ok_or_else(|| PipelineError::Exec(format!("key {:?} holds no array", self.input_name)))?;
        let rows = detection_rows(array)?;

        let boxes = rows
            .into_iter()
            .filter(|row| f64::from(row[4]) >= self.threshold)
            .map(|row| {
                Value::BoundingBox(
                    BoundingBox::new(
                        f64::from(row[0]),
                        f64::from(row[1]),
                        f64::from(row[2]),
                        f64::from(row[3]),
                    )
                    .probability(f64::from(row[4])),
                )
            })
            .collect();

        input.insert(
            self.output_name.clone(),
            Value::List(ValueType::BoundingBox, boxes),
        )?;
        Ok(input)
    }
}

/// Read rank-2 f32 detections as rows of 5, whichever representation the
/// array is in.
fn detection_rows(array: &NDArray) -> Result<Vec<[f32; 5]>, PipelineError> {
    let serialized = array.to_serialized();
    if serialized.dtype() != konduit_core::DType::F32 {
        return Err(PipelineError::Exec(format!(
            "detections must be f32, got {}",
            serialized.dtype()
        )));
    }
    let shape = serialized.shape();
    if shape.len() != 2 || shape[1] != 5 {
        return Err(PipelineError::Exec(format!(
            "detections must have shape [n, 5], got {:?}",
            shape
        )));
    }

    let values: Vec<f32> = serialized
        .data()
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    Ok(values
        .chunks_exact(5)
        .map(|row| [row[0], row[1], row[2], row[3], row[4]])
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_to_point_top_left() {
        let config = StepConfig::new("bbox_to_point")
            .option("method", "top_left")
            .option("output_name", "pt");
        let mut runner = BboxToPointRunner::from_config(&config).unwrap();
        let bbox = BoundingBox::new(1.0, 2.0, 4.0, 6.0).label("foo").probability(0.5);
        let input = Data::new().with("bbox", bbox.clone()).unwrap();

        let out = runner.exec(input).unwrap();

        let point = out.get_point("pt").unwrap();
        assert_eq!(point.x, 1.0);
        assert_eq!(point.y, 2.0);
        assert_eq!(point.label.as_deref(), Some("foo"));
        assert_eq!(point.probability, Some(0.5));
        // Input key passes through untouched
        assert_eq!(out.get_bounding_box("bbox"), Some(&bbox));
    }

    #[test]
    fn test_bbox_to_point_center_over_list() {
        let config = StepConfig::new("bbox_to_point");
        let mut runner = BboxToPointRunner::from_config(&config).unwrap();
        let boxes = Value::list(
            ValueType::BoundingBox,
            vec![
                Value::BoundingBox(BoundingBox::new(0.0, 0.0, 2.0, 2.0)),
                Value::BoundingBox(BoundingBox::new(2.0, 2.0, 6.0, 4.0)),
            ],
        )
        .unwrap();
        let mut input = Data::new();
        input.insert("bbox", boxes).unwrap();

        let out = runner.exec(input).unwrap();

        let (elem, points) = out.get_list("point").unwrap();
        assert_eq!(*elem, ValueType::Point);
        assert_eq!(points[0], Value::Point(Point::new(1.0, 1.0)));
        assert_eq!(points[1], Value::Point(Point::new(4.0, 3.0)));
    }

    #[test]
    fn test_unknown_method_fails_init() {
        let config = StepConfig::new("bbox_to_point").option("method", "diagonal");

        let err = BboxToPointRunner::from_config(&config).unwrap_err();

        assert!(matches!(err, PipelineError::RunnerInit { .. }));
    }

    #[test]
    fn test_point_to_bbox_roundtrip_center() {
        let to_bbox = StepConfig::new("point_to_bbox")
            .option("width", 4.0)
            .option("height", 2.0);
        let mut runner = PointToBboxRunner::from_config(&to_bbox).unwrap();
        let input = Data::new()
            .with("point", Point::new(10.0, 20.0).label("p"))
            .unwrap();

        let out = runner.exec(input).unwrap();

        let bbox = out.get_bounding_box("bbox").unwrap();
        assert_eq!((bbox.x1, bbox.y1, bbox.x2, bbox.y2), (8.0, 19.0, 12.0, 21.0));
        assert_eq!(bbox.label.as_deref(), Some("p"));
    }

    #[test]
    fn test_point_to_bbox_requires_extent() {
        let config = StepConfig::new("point_to_bbox").option("width", 4.0);

        let err = PointToBboxRunner::from_config(&config).unwrap_err();

        assert!(matches!(err, PipelineError::RunnerInit { .. }));
    }

    #[test]
    fn test_ssd_filters_by_threshold() {
        let config = StepConfig::new("ssd_to_bbox").option("threshold", 0.6);
        let mut runner = SsdToBboxRunner::from_config(&config).unwrap();
        let detections = NDArray::from_nested2(vec![
            vec![0.0f32, 0.0, 1.0, 1.0, 0.9],
            vec![1.0, 1.0, 2.0, 2.0, 0.3],
            vec![2.0, 2.0, 3.0, 3.0, 0.6],
        ])
        .unwrap();
        let input = Data::new().with("detections", detections).unwrap();

        let out = runner.exec(input).unwrap();

        let (_, boxes) = out.get_list("bounding_boxes").unwrap();
        assert_eq!(boxes.len(), 2);
        let Value::BoundingBox(first) = &boxes[0] else {
            panic!("expected a bounding box");
        };
        assert_eq!(first.probability, Some(f64::from(0.9f32)));
    }

    #[test]
    fn test_ssd_rejects_bad_shape() {
        let config = StepConfig::new("ssd_to_bbox");
        let mut runner = SsdToBboxRunner::from_config(&config).unwrap();
        let detections = NDArray::from_vec(vec![1.0f32, 2.0, 3.0]);
        let input = Data::new().with("detections", detections).unwrap();

        let err = runner.exec(input).unwrap_err();

        assert!(matches!(err, PipelineError::Exec(_)));
    }
}
