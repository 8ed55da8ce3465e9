//! Physical constants in the units the template builder works in.

/// Solar bolometric luminosity, erg/s.
pub const LSUN_CGS: f64 = 3.839e33;
/// Speed of light, cm/s.
pub const C_CGS: f64 = 2.99792458e10;
/// Speed of light, km/s.
pub const C_KMS: f64 = 2.99792458e5;
pub const ANGSTROM_PER_CM: f64 = 1.0e8;

pub const SSP_DATA_DIR_ENV: &str = "SSP_DATA_DIR";
pub const DEFAULT_MODEL_FAMILY: &str = "SSP_Padova_RRLIB_Kroupa_Z0.0190";
