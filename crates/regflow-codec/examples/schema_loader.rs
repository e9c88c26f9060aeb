use std::collections::HashMap;
use std::fs;

use regflow_codec::address_map::{AddressMap, Registers};
use regflow_codec::schema::{
    build_from_device_config, parse_data_types_by_source, resolve_static_data_types, yaml_to_value,
};
use regflow_core::types::{Value, ValueMap};

const DEVICE_SCHEMA: &str = r#"
parameters:
  speed:
    source: holding
    form:
      type: Param
      address: 0
      idx: speed
      scale: 0.1
  state:
    source: holding
    form:
      type: ParamLookup
      address: 1
      idx: state
      table:
        0: stopped
        1: running
        2: tripped
  flow:
    source: input
    form:
      type: ParamCTypeScale
      address: 2
      idx: flow
      data_type: float
      scale: 0.5
  serial:
    source: static
    form:
      type: ref_param
      param: serial_number
  model:
    source: static
    form:
      type: value
      value: PR-9000
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    regflow_core::init()?;

    // Load the schema from a config file
    println!("Loading the device schema...");
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("device.yaml");
    fs::write(&path, DEVICE_SCHEMA)?;
    let parameters = build_from_device_config(&path)?;
    println!("Built {} parameters", parameters.len());

    // Decode a poll result through the loaded parameters
    println!("Decoding a poll result...");
    let mut registers = AddressMap::new();
    registers.save_block(0, &[250, 1, 0x4248, 0x0000])?;

    let mut data = HashMap::new();
    for parameter in parameters.values() {
        data.extend(parameter.decode(&registers, None));
    }
    let mut names: Vec<&String> = data.keys().collect();
    names.sort();
    for name in names {
        println!("  {} = {:?}", name, data[name]);
    }

    // The same document can be grouped by source or resolved statically
    println!("Grouping parameters by source...");
    let yaml: serde_yaml::Value = serde_yaml::from_str(DEVICE_SCHEMA)?;
    let doc = yaml_to_value(&yaml)?;
    let sections = doc.try_object()?["parameters"].try_object()?.clone();

    let meta = ValueMap::from([("serial_number".to_string(), Value::from(77001))]);
    let by_source = parse_data_types_by_source(&sections, &meta);
    for (source, params) in &by_source {
        println!("  {}: {} parameters", source, params.len());
    }

    println!("Resolving static parameters...");
    let statics = resolve_static_data_types(&sections, &meta);
    let mut names: Vec<&String> = statics.keys().collect();
    names.sort();
    for name in names {
        println!("  {} = {:?}", name, statics[name]);
    }

    println!("Example completed successfully!");
    Ok(())
}
