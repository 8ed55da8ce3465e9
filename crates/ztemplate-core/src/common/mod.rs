pub mod config;
pub mod constants;

pub use config::{
    BroadeningConfig, OutputGridConfig, PhysicalConstants, SubsetConfig, TemplateConfig,
    TemplateIdentity,
};
