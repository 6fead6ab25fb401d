pub mod cache;
pub mod navigation;
pub mod preference;

pub use cache::TileCache;
pub use navigation::{
    Navigation, parse_fragment, resolve, random_point, minimap_target,
};
pub use preference::{
    ColorPreference, PreferenceStore, FileStore, MemoryStore,
    USER_HEX_KEY,
};
