//! Loading catalogs and architecture data from JSON.

#![cfg_attr(not(feature = "serde"), allow(unused_crate_dependencies))]
#![cfg(feature = "serde")]
#![allow(clippy::pedantic, clippy::nursery)]

use std::sync::Arc;

use env_logger as _;
use instruction_db::{run_transform_pipeline, PipelineConfig};
use log as _;
use proptest as _;
use rstest as _;
use serde as _;
use thiserror as _;
use uarch_db::{
    Architecture, MicroArchitectureCatalog, MicroArchitectureData, MicroArchitectureRegistry,
    PortMask,
};

const CATALOG: &str = r#"{
    "microarchitectures": [
        {
            "id": "hsw",
            "model_ids": ["intel:06_3C", "intel:06_45"],
            "port_masks": [12, 16, 99],
            "load_store_address_generation_port_mask_index": 1,
            "store_data_port_mask_index": 2,
            "protected_modes": [0]
        },
        {
            "id": "zen2",
            "model_ids": ["amd:17_31"],
            "user_modes": [3]
        }
    ]
}"#;

const ARCHITECTURE: &str = r#"{
    "instruction_set": {
        "instructions": [
            { "mnemonic": "CLFLUSH", "raw_encoding_specification": "NP 0F AE /7",
              "encoding": { "opcode": 4014, "modrm_usage": "OpcodeExtensionInModRm" } },
            { "mnemonic": "CLI", "raw_encoding_specification": "FA",
              "encoding": { "opcode": 250 } }
        ]
    },
    "per_microarchitecture_itineraries": [
        {
            "microarchitecture_id": "hsw",
            "itineraries": [
                { "micro_ops": [{ "port_mask": 12, "latency": 4 }] },
                { "micro_ops": [] }
            ]
        }
    ]
}"#;

#[test]
fn catalog_loads_from_json() {
    let catalog: MicroArchitectureCatalog = serde_json::from_str(CATALOG).unwrap();
    let registry = MicroArchitectureRegistry::from_catalog(&catalog);

    let hsw = registry.microarchitecture_for_cpu_model("intel:06_45");
    assert_eq!(hsw.load_store_address_generation(), Some(&PortMask::from_ports([2, 3])));
    assert_eq!(hsw.store_address_generation(), None);
    assert_eq!(hsw.store_data(), Some(&PortMask::from_ports([4])));
    assert!(registry.microarchitecture("zen2").unwrap().is_protected_mode(0));
    assert!(!registry.microarchitecture("zen2").unwrap().is_protected_mode(3));
}

#[test]
fn architecture_loads_from_json_and_binds() {
    let catalog: MicroArchitectureCatalog = serde_json::from_str(CATALOG).unwrap();
    let registry = MicroArchitectureRegistry::from_catalog(&catalog);
    let mut architecture: Architecture = serde_json::from_str(ARCHITECTURE).unwrap();
    run_transform_pipeline(&mut architecture.instruction_set, &PipelineConfig::default()).unwrap();

    let data =
        MicroArchitectureData::for_microarchitecture_id(&registry, Arc::new(architecture), "hsw")
            .unwrap();
    let (clflush, itinerary) = data.iter().next().unwrap();
    assert_eq!(clflush.feature_name.as_deref(), Some("CLFSH"));
    assert_eq!(itinerary.micro_ops[0].port_mask, PortMask::from_bits(12));
    assert!(itinerary.micro_ops[0].dependencies.is_empty());
    assert_eq!(data.instruction_set().instructions[1].protection_mode, 0);
}

#[test]
fn pipeline_config_loads_from_json() {
    let config: PipelineConfig =
        serde_json::from_str(r#"{ "excluded_transforms": ["add_protection_modes"] }"#).unwrap();
    assert_eq!(config, PipelineConfig::excluding(["add_protection_modes"]));
}
