use std::collections::HashMap;

use regflow_codec::address_map::{AddressMap, Registers};
use regflow_codec::params::{
    CType, Param, ParamBits, ParamCTypeScale, ParamLookup, ParamMask, ParamText, Parameter,
};
use regflow_core::types::Value;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    regflow_core::init()?;

    // Describe the device's register layout
    println!("Building the parameter table...");
    let bitmask = HashMap::from([("running".to_string(), 0), ("fault".to_string(), 1)]);
    let states = HashMap::from([
        (0, "stopped".to_string()),
        (1, "running".to_string()),
        (2, "tripped".to_string()),
    ]);
    let parameters: Vec<Parameter> = vec![
        Param::new(0, "speed").with_scale(0.1).into(),
        ParamMask::new(5, "temperature")
            .with_mask(0x0FF0)
            .with_rshift(4)
            .into(),
        ParamBits::new(6, bitmask).into(),
        ParamLookup::new(7, "state", states).into(),
        ParamCTypeScale::new(8, "flow", CType::Float)
            .with_scale(0.5)
            .into(),
        ParamText::new(10, "serial", 4).into(),
    ];

    // Fill the register map the way a bus poll would
    println!("Filling the register map...");
    let mut registers = AddressMap::new();
    registers.save_block(0, &[250])?;
    registers.set(5, 0x0230)?;
    registers.set(6, 0b01)?;
    registers.set(7, 1)?;
    registers.save_block(8, &[0x4248, 0x0000])?;
    registers.save_block(10, &[0x4142, 0x4344, 0, 0])?;

    // Decode every parameter against the same map
    println!("Decoding...");
    let mut data = HashMap::new();
    for parameter in &parameters {
        data.extend(parameter.decode(&registers, None));
    }

    let mut names: Vec<&String> = data.keys().collect();
    names.sort();
    for name in names {
        println!("  {} = {:?}", name, data[name]);
    }

    // Push new values back through the parameters that own them
    println!("Encoding a new speed setpoint and temperature...");
    let mut writes = HashMap::new();
    writes.insert("speed".to_string(), Value::from(30.0));
    writes.insert("temperature".to_string(), Value::from(40));
    for parameter in &parameters {
        if parameter.keys().iter().any(|key| writes.contains_key(key)) {
            parameter.encode(&writes, &mut registers)?;
        }
    }

    println!("Register 0 now holds {}", registers.get(0)?);
    println!("Register 5 now holds {:#06x}", registers.get(5)?);

    println!("Example completed successfully!");
    Ok(())
}
