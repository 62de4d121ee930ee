pub mod ci_map;
pub mod duration;

pub use ci_map::CiMap;
pub use duration::parse_duration;
