//! Android manifest handling: `minSdkVersion` reads and normalizing rewrites.

pub mod sdk;
