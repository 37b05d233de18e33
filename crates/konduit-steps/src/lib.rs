//! Bundled pipeline steps and switch functions.
//!
//! Call [`register_all`] to install the step types and
//! [`register_switches`] for the routing functions, or use
//! [`default_registries`] for both at once.

mod geometry;
mod image;
mod switches;

pub use geometry::{BboxToPointRunner, CornerMethod, PointToBboxRunner, SsdToBboxRunner};
pub use image::{ChannelLayout, ImageToNDArrayRunner};
pub use switches::{IntValueSwitch, ListEmptySwitch};

use konduit_core::{StepRegistry, SwitchRegistry};

/// Register every bundled step type.
pub fn register_all(registry: &mut StepRegistry) {
    registry.register("bbox_to_point", |config| {
        Ok(Box::new(BboxToPointRunner::from_config(config)?))
    });
    registry.register("point_to_bbox", |config| {
        Ok(Box::new(PointToBboxRunner::from_config(config)?))
    });
    registry.register("image_to_ndarray", |config| {
        Ok(Box::new(ImageToNDArrayRunner::from_config(config)?))
    });
    registry.register("ssd_to_bbox", |config| {
        Ok(Box::new(SsdToBboxRunner::from_config(config)?))
    });
}

/// Register every bundled switch function.
pub fn register_switches(registry: &mut SwitchRegistry) {
    registry.register("list_empty", |config| {
        Ok(Box::new(ListEmptySwitch::from_config(config)?))
    });
    registry.register("int_value", |config| {
        Ok(Box::new(IntValueSwitch::from_config(config)?))
    });
}

/// Step and switch registries with everything registered.
pub fn default_registries() -> (StepRegistry, SwitchRegistry) {
    let mut steps = StepRegistry::new();
    register_all(&mut steps);
    let mut switches = SwitchRegistry::new();
    register_switches(&mut switches);
    (steps, switches)
}
