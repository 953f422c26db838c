/// Dataset directory layout contract

/// Per-collection camera metadata file written by the capture driver
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Final training manifest file name
pub const MANIFEST_FILE_NAME: &str = "dataset.json";

/// Filename marker for depth map outputs
pub const DEPTH_MARKER: &str = "_depth_";

/// Filename marker for normal map outputs
pub const NORMAL_MARKER: &str = "_normal_";

/// Default edge length for packaged training images (pixels)
pub const DEFAULT_RESOLUTION: u32 = 256;

/// Default worker count for parallel passes
pub const DEFAULT_JOBS: usize = 8;
