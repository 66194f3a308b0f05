pub mod clock;
mod identity;
mod lat_lng;
mod location_record;
mod location_sample;

pub use identity::Identity;
pub use lat_lng::LatLng;
pub use location_record::LocationRecord;
pub use location_sample::{LocationSample, SampleError, SampleResult};
