/*!
 * Declarative parameter schemas.
 *
 * Device schemas are YAML documents with a top level `parameters` section.
 * Each entry carries a `form` object whose `type` field names a parameter
 * variant; the remaining fields are that variant's settings, given either
 * verbatim or as reference objects resolved against a shared `meta` table.
 *
 * Loading is best effort: one malformed entry is logged and skipped so it
 * cannot block the rest of the schema.
 */
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use regflow_core::logging::operation_span;
use regflow_core::types::{Address, Value, ValueMap};

use crate::error::{Error, Result};
use crate::params::{
    CType, Param, ParamBits, ParamBoolArray, ParamCType, ParamCTypeScale, ParamCTypeScaleModulus,
    ParamDict, ParamEnumBoolArray, ParamLookup, ParamMask, ParamMaskBool, ParamMaskScale,
    ParamOffset, ParamStatic, ParamText, Parameter,
};
use crate::words::{ByteOrder, WordOrder};

/// Load a device config file and build its parameter table
pub fn build_from_device_config<P: AsRef<Path>>(path: P) -> Result<HashMap<String, Parameter>> {
    let span = operation_span("build_parameters", "schema");
    let _guard = span.enter();

    let text = fs::read_to_string(path.as_ref())?;
    let doc: serde_yaml::Value = serde_yaml::from_str(&text)?;
    let doc = yaml_to_value(&doc)?;
    let parameters = doc
        .try_object()?
        .get("parameters")
        .ok_or_else(|| Error::schema("device config has no parameters section"))?
        .try_object()?
        .clone();
    Ok(parse_data_types(&parameters, &ValueMap::new()))
}

/// Convert a parsed YAML document into the shared value model
///
/// Mapping keys become strings: numeric and boolean keys are stringified,
/// any other key kind is rejected.
pub fn yaml_to_value(yaml: &serde_yaml::Value) -> Result<Value> {
    Ok(match yaml {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(*b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_yaml::Value::String(s) => Value::String(s.clone()),
        serde_yaml::Value::Sequence(seq) => {
            let mut values = Vec::with_capacity(seq.len());
            for item in seq {
                values.push(yaml_to_value(item)?);
            }
            Value::Array(values)
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut object = ValueMap::new();
            for (key, value) in mapping {
                let key = match key {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => {
                        return Err(Error::schema(format!(
                            "unsupported mapping key: {:?}",
                            other
                        )))
                    }
                };
                object.insert(key, yaml_to_value(value)?);
            }
            Value::Object(object)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_value(&tagged.value)?,
    })
}

/// Build a parameter table from a `parameters` section
///
/// Entries that fail to parse are logged and skipped.
pub fn parse_data_types(parameters: &ValueMap, meta: &ValueMap) -> HashMap<String, Parameter> {
    let mut params = HashMap::new();
    for (name, entry) in parameters {
        match parse_entry(entry, meta) {
            Ok(param) => {
                params.insert(name.clone(), param);
            }
            Err(e) => {
                warn!(parameter = %name, error = %e, "skipping unparseable parameter entry");
            }
        }
    }
    params
}

/// Build parameter tables grouped by each entry's `source` tag
///
/// Entries without a source are skipped.
pub fn parse_data_types_by_source(
    parameters: &ValueMap,
    meta: &ValueMap,
) -> HashMap<String, HashMap<String, Parameter>> {
    let mut by_source: HashMap<String, HashMap<String, Parameter>> = HashMap::new();
    for (name, entry) in parameters {
        let source = entry
            .as_object()
            .and_then(|obj| obj.get("source"))
            .and_then(Value::as_str);
        let Some(source) = source else {
            debug!(parameter = %name, "parameter entry has no source, skipping");
            continue;
        };
        match parse_entry(entry, meta) {
            Ok(param) => {
                by_source
                    .entry(source.to_string())
                    .or_default()
                    .insert(name.clone(), param);
            }
            Err(e) => {
                warn!(parameter = %name, error = %e, "skipping unparseable parameter entry");
            }
        }
    }
    by_source
}

/// Resolve the literal values of every parameter with a `static` source
pub fn resolve_static_data_types(parameters: &ValueMap, meta: &ValueMap) -> ValueMap {
    let mut resolved = ValueMap::new();
    for (name, entry) in parameters {
        let Some(obj) = entry.as_object() else {
            continue;
        };
        if obj.get("source").and_then(Value::as_str) != Some("static") {
            continue;
        }
        let form = obj.get("form").and_then(Value::as_object);
        let Some(form) = form else {
            warn!(parameter = %name, "static parameter entry has no form, skipping");
            continue;
        };
        match resolve_param(form, meta) {
            Ok(value) => {
                resolved.insert(name.clone(), value);
            }
            Err(e) => {
                warn!(parameter = %name, error = %e, "skipping unresolvable static parameter");
            }
        }
    }
    resolved
}

fn parse_entry(entry: &Value, meta: &ValueMap) -> Result<Parameter> {
    let form = entry
        .try_object()?
        .get("form")
        .ok_or_else(|| Error::schema("parameter entry has no form"))?
        .try_object()?;
    let type_name = form
        .get("type")
        .ok_or_else(|| Error::schema("parameter form has no type"))?
        .try_str()?
        .to_string();
    let mut fields = form.clone();
    fields.remove("type");
    parse_data_type_class(&type_name, meta, fields)
}

/// Resolve a reference object against the meta table
///
/// `{"type": "value", "value": X}` produces `X` verbatim.
/// `{"type": "ref_param", "param": P}` produces `meta[P]`, nulled when it
/// equals the `null_ref` sentinel and shifted by `offset` when both sides
/// are numeric.
pub fn resolve_param(reference: &ValueMap, meta: &ValueMap) -> Result<Value> {
    let kind = reference
        .get("type")
        .ok_or_else(|| Error::schema("reference object has no type"))?
        .try_str()?;
    match kind {
        "value" => Ok(reference
            .get("value")
            .ok_or_else(|| Error::schema("value reference has no value field"))?
            .clone()),
        "ref_param" => {
            let param = reference
                .get("param")
                .ok_or_else(|| Error::schema("ref_param reference has no param field"))?
                .try_str()?;
            let referenced = meta
                .get(param)
                .ok_or_else(|| Error::schema(format!("meta has no entry for {}", param)))?;
            if let Some(null_ref) = reference.get("null_ref") {
                if referenced == null_ref {
                    return Ok(Value::Null);
                }
            }
            let Some(offset) = reference.get("offset") else {
                return Ok(referenced.clone());
            };
            apply_offset(referenced, offset)
        }
        other => Err(Error::schema(format!("unknown reference type: {}", other))),
    }
}

/// Shift a referenced value by an offset when it is numeric
///
/// Non numeric referenced values pass through unchanged.
fn apply_offset(referenced: &Value, offset: &Value) -> Result<Value> {
    match referenced {
        Value::Integer(v) => match offset {
            Value::Integer(o) => Ok(Value::Integer(v + o)),
            Value::Float(o) => Ok(Value::Float(*v as f64 + o)),
            other => Err(Error::schema(format!(
                "offset must be numeric, got {}",
                other.kind()
            ))),
        },
        Value::Float(v) => {
            let o = offset.try_float()?;
            Ok(Value::Float(v + o))
        }
        other => Ok(other.clone()),
    }
}

/// Recursively resolve reference objects within a field table
///
/// Any nested object carrying a `type` key is treated as a reference;
/// every other leaf passes through unchanged.
pub fn resolve_param_dict(fields: &ValueMap, meta: &ValueMap) -> Result<ValueMap> {
    let mut resolved = ValueMap::new();
    for (key, value) in fields {
        resolved.insert(key.clone(), resolve_value(value, meta)?);
    }
    Ok(resolved)
}

/// Recursively resolve reference objects within a list
pub fn resolve_param_list(values: &[Value], meta: &ValueMap) -> Result<Vec<Value>> {
    values.iter().map(|value| resolve_value(value, meta)).collect()
}

fn resolve_value(value: &Value, meta: &ValueMap) -> Result<Value> {
    match value {
        Value::Object(obj) if obj.contains_key("type") => resolve_param(obj, meta),
        Value::Object(obj) => Ok(Value::Object(resolve_param_dict(obj, meta)?)),
        Value::Array(values) => Ok(Value::Array(resolve_param_list(values, meta)?)),
        other => Ok(other.clone()),
    }
}

/// Instantiate the named parameter variant from its resolved fields
pub fn parse_data_type_class(
    type_name: &str,
    meta: &ValueMap,
    fields: ValueMap,
) -> Result<Parameter> {
    let fields = resolve_param_dict(&fields, meta)?;
    match type_name {
        "Param" => build_param(&fields),
        "ParamStatic" => build_static(&fields),
        "ParamBoolArray" => build_bool_array(&fields),
        "ParamEnumBoolArray" => build_enum_bool_array(&fields),
        "ParamText" => build_text(&fields),
        "ParamDict" => build_dict(&fields),
        "ParamBits" => build_bits(&fields),
        "ParamMask" => build_mask(&fields),
        "ParamOffset" => build_offset(&fields),
        "ParamMaskBool" => build_mask_bool(&fields),
        "ParamMaskScale" => build_mask_scale(&fields),
        "ParamLookup" => build_lookup(&fields),
        "ParamCType" => build_ctype(&fields),
        "ParamCTypeScale" => build_ctype_scale(&fields),
        "ParamCTypeScaleModulus" => build_ctype_scale_modulus(&fields),
        other => Err(Error::schema(format!("unknown parameter type: {}", other))),
    }
}

fn ensure_known(fields: &ValueMap, type_name: &str, allowed: &[&str]) -> Result<()> {
    for key in fields.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(Error::schema(format!(
                "unexpected field {} for {}",
                key, type_name
            )));
        }
    }
    Ok(())
}

fn req<'a>(fields: &'a ValueMap, key: &str) -> Result<&'a Value> {
    fields
        .get(key)
        .ok_or_else(|| Error::schema(format!("missing field {}", key)))
}

fn address_of(value: &Value) -> Result<Address> {
    let raw = value.try_integer()?;
    Address::try_from(raw).map_err(|_| Error::schema(format!("address {} out of range", raw)))
}

fn address(fields: &ValueMap) -> Result<Address> {
    address_of(req(fields, "address")?)
}

fn address_list(fields: &ValueMap) -> Result<Vec<Address>> {
    match req(fields, "address")? {
        Value::Array(values) => values.iter().map(address_of).collect(),
        single => Ok(vec![address_of(single)?]),
    }
}

fn string(fields: &ValueMap, key: &str) -> Result<String> {
    Ok(req(fields, key)?.try_str()?.to_string())
}

fn opt_f64(fields: &ValueMap, key: &str) -> Result<Option<f64>> {
    fields.get(key).map(Value::try_float).transpose().map_err(Error::from)
}

fn opt_u32(fields: &ValueMap, key: &str) -> Result<Option<u32>> {
    let Some(value) = fields.get(key) else {
        return Ok(None);
    };
    let raw = value.try_integer()?;
    u32::try_from(raw)
        .map(Some)
        .map_err(|_| Error::schema(format!("{} {} out of range", key, raw)))
}

fn opt_u16(fields: &ValueMap, key: &str) -> Result<Option<u16>> {
    let Some(value) = fields.get(key) else {
        return Ok(None);
    };
    let raw = value.try_integer()?;
    u16::try_from(raw)
        .map(Some)
        .map_err(|_| Error::schema(format!("{} {} out of range", key, raw)))
}

fn opt_bool(fields: &ValueMap, key: &str) -> Result<Option<bool>> {
    fields.get(key).map(Value::try_bool).transpose().map_err(Error::from)
}

fn req_i64(fields: &ValueMap, key: &str) -> Result<i64> {
    Ok(req(fields, key)?.try_integer()?)
}

fn opt_i64(fields: &ValueMap, key: &str) -> Result<Option<i64>> {
    fields.get(key).map(Value::try_integer).transpose().map_err(Error::from)
}

fn req_usize(fields: &ValueMap, key: &str) -> Result<usize> {
    let raw = req_i64(fields, key)?;
    usize::try_from(raw).map_err(|_| Error::schema(format!("{} {} out of range", key, raw)))
}

fn table_key(key: &str) -> Result<i64> {
    if let Some(hex) = key.strip_prefix("0x").or_else(|| key.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16)
            .map_err(|_| Error::schema(format!("invalid table key: {}", key)));
    }
    key.parse::<i64>()
        .map_err(|_| Error::schema(format!("invalid table key: {}", key)))
}

fn int_table(fields: &ValueMap, key: &str) -> Result<HashMap<i64, String>> {
    let object = req(fields, key)?.try_object()?;
    let mut table = HashMap::with_capacity(object.len());
    for (code, label) in object {
        table.insert(table_key(code)?, label.try_str()?.to_string());
    }
    Ok(table)
}

fn value_table(fields: &ValueMap, key: &str) -> Result<HashMap<String, Value>> {
    Ok(req(fields, key)?.try_object()?.clone())
}

fn bitmask(fields: &ValueMap) -> Result<HashMap<String, u32>> {
    let object = req(fields, "bitmask")?.try_object()?;
    let mut mask = HashMap::with_capacity(object.len());
    for (name, bit) in object {
        let bit = bit.try_integer()?;
        let bit = u32::try_from(bit)
            .ok()
            .filter(|bit| *bit < 16)
            .ok_or_else(|| Error::schema(format!("bit {} out of range for {}", bit, name)))?;
        mask.insert(name.clone(), bit);
    }
    Ok(mask)
}

fn byte_order(fields: &ValueMap) -> Result<Option<ByteOrder>> {
    fields
        .get("byte_order")
        .map(|value| value.try_str()?.parse::<ByteOrder>())
        .transpose()
}

fn word_order(fields: &ValueMap) -> Result<Option<WordOrder>> {
    fields
        .get("word_order")
        .map(|value| value.try_str()?.parse::<WordOrder>())
        .transpose()
}

fn data_type(fields: &ValueMap) -> Result<CType> {
    req(fields, "data_type")?.try_str()?.parse::<CType>()
}

fn block_of(fields: &ValueMap) -> Option<Value> {
    fields.get("block").cloned()
}

fn build_param(fields: &ValueMap) -> Result<Parameter> {
    ensure_known(
        fields,
        "Param",
        &["address", "idx", "scale", "significant_figures", "block"],
    )?;
    let mut param = Param::new(address(fields)?, string(fields, "idx")?);
    if let Some(scale) = opt_f64(fields, "scale")? {
        param = param.with_scale(scale);
    }
    if let Some(figures) = opt_u32(fields, "significant_figures")? {
        param = param.with_significant_figures(figures);
    }
    if let Some(block) = block_of(fields) {
        param = param.with_block(block);
    }
    Ok(param.into())
}

fn build_static(fields: &ValueMap) -> Result<Parameter> {
    ensure_known(fields, "ParamStatic", &["value", "idx", "block"])?;
    let mut param = ParamStatic::new(req(fields, "value")?.clone(), string(fields, "idx")?);
    if let Some(block) = block_of(fields) {
        param = param.with_block(block);
    }
    Ok(param.into())
}

fn build_bool_array(fields: &ValueMap) -> Result<Parameter> {
    ensure_known(
        fields,
        "ParamBoolArray",
        &["address", "idx", "length", "block"],
    )?;
    let mut param = ParamBoolArray::new(
        address_list(fields)?,
        string(fields, "idx")?,
        req_usize(fields, "length")?,
    );
    if let Some(block) = block_of(fields) {
        param = param.with_block(block);
    }
    Ok(param.into())
}

fn build_enum_bool_array(fields: &ValueMap) -> Result<Parameter> {
    ensure_known(
        fields,
        "ParamEnumBoolArray",
        &["address", "table", "terminator", "block"],
    )?;
    let mut param = ParamEnumBoolArray::new(address_list(fields)?, int_table(fields, "table")?);
    if let Some(terminator) = opt_i64(fields, "terminator")? {
        param = param.with_terminator(terminator);
    }
    if let Some(block) = block_of(fields) {
        param = param.with_block(block);
    }
    Ok(param.into())
}

fn build_text(fields: &ValueMap) -> Result<Parameter> {
    ensure_known(
        fields,
        "ParamText",
        &[
            "address",
            "idx",
            "length",
            "swap_bytes",
            "swap_words",
            "padding",
            "strip",
            "block",
        ],
    )?;
    let mut param = ParamText::new(
        address(fields)?,
        string(fields, "idx")?,
        req_usize(fields, "length")?,
    );
    if let Some(swap_bytes) = opt_bool(fields, "swap_bytes")? {
        param = param.with_swap_bytes(swap_bytes);
    }
    if let Some(swap_words) = opt_bool(fields, "swap_words")? {
        param = param.with_swap_words(swap_words);
    }
    if let Some(padding) = fields.get("padding") {
        let raw = padding.try_integer()?;
        let padding = u8::try_from(raw)
            .map_err(|_| Error::schema(format!("padding {} out of range", raw)))?;
        param = param.with_padding(padding);
    }
    if let Some(strip) = fields.get("strip") {
        param = param.with_strip(strip.try_str()?);
    }
    if let Some(block) = block_of(fields) {
        param = param.with_block(block);
    }
    Ok(param.into())
}

fn build_dict(fields: &ValueMap) -> Result<Parameter> {
    ensure_known(fields, "ParamDict", &["idx", "key", "table"])?;
    let mut param = ParamDict::new(string(fields, "idx")?, value_table(fields, "table")?);
    if let Some(key) = fields.get("key") {
        param = param.with_key(key.try_str()?);
    }
    Ok(param.into())
}

fn build_bits(fields: &ValueMap) -> Result<Parameter> {
    ensure_known(fields, "ParamBits", &["address", "bitmask", "block"])?;
    let mut param = ParamBits::new(address(fields)?, bitmask(fields)?);
    if let Some(block) = block_of(fields) {
        param = param.with_block(block);
    }
    Ok(param.into())
}

fn build_mask(fields: &ValueMap) -> Result<Parameter> {
    ensure_known(
        fields,
        "ParamMask",
        &["address", "idx", "mask", "rshift", "block"],
    )?;
    let mut param = ParamMask::new(address(fields)?, string(fields, "idx")?);
    if let Some(mask) = opt_u16(fields, "mask")? {
        param = param.with_mask(mask);
    }
    if let Some(rshift) = opt_u32(fields, "rshift")? {
        param = param.with_rshift(rshift);
    }
    if let Some(block) = block_of(fields) {
        param = param.with_block(block);
    }
    Ok(param.into())
}

fn build_offset(fields: &ValueMap) -> Result<Parameter> {
    ensure_known(
        fields,
        "ParamOffset",
        &["address", "idx", "offset", "block"],
    )?;
    let mut param = ParamOffset::new(
        address(fields)?,
        string(fields, "idx")?,
        req_i64(fields, "offset")?,
    );
    if let Some(block) = block_of(fields) {
        param = param.with_block(block);
    }
    Ok(param.into())
}

fn build_mask_bool(fields: &ValueMap) -> Result<Parameter> {
    ensure_known(
        fields,
        "ParamMaskBool",
        &["address", "idx", "mask", "rshift", "block"],
    )?;
    let mask = opt_u16(fields, "mask")?
        .ok_or_else(|| Error::schema("missing field mask"))?;
    let mut param = ParamMaskBool::new(address(fields)?, string(fields, "idx")?, mask);
    if let Some(rshift) = opt_u32(fields, "rshift")? {
        param = param.with_rshift(rshift);
    }
    if let Some(block) = block_of(fields) {
        param = param.with_block(block);
    }
    Ok(param.into())
}

fn build_mask_scale(fields: &ValueMap) -> Result<Parameter> {
    ensure_known(
        fields,
        "ParamMaskScale",
        &[
            "address",
            "idx",
            "mask",
            "rshift",
            "scale",
            "significant_figures",
            "block",
        ],
    )?;
    let mut param = ParamMaskScale::new(address(fields)?, string(fields, "idx")?);
    if let Some(mask) = opt_u16(fields, "mask")? {
        param = param.with_mask(mask);
    }
    if let Some(rshift) = opt_u32(fields, "rshift")? {
        param = param.with_rshift(rshift);
    }
    if let Some(scale) = opt_f64(fields, "scale")? {
        param = param.with_scale(scale);
    }
    if let Some(figures) = opt_u32(fields, "significant_figures")? {
        param = param.with_significant_figures(figures);
    }
    if let Some(block) = block_of(fields) {
        param = param.with_block(block);
    }
    Ok(param.into())
}

fn build_lookup(fields: &ValueMap) -> Result<Parameter> {
    ensure_known(
        fields,
        "ParamLookup",
        &["address", "idx", "table", "mask", "rshift", "block"],
    )?;
    let mut param = ParamLookup::new(
        address(fields)?,
        string(fields, "idx")?,
        int_table(fields, "table")?,
    );
    if let Some(mask) = opt_u16(fields, "mask")? {
        param = param.with_mask(mask);
    }
    if let Some(rshift) = opt_u32(fields, "rshift")? {
        param = param.with_rshift(rshift);
    }
    if let Some(block) = block_of(fields) {
        param = param.with_block(block);
    }
    Ok(param.into())
}

fn build_ctype(fields: &ValueMap) -> Result<Parameter> {
    ensure_known(
        fields,
        "ParamCType",
        &["address", "idx", "data_type", "byte_order", "word_order", "block"],
    )?;
    let mut param = ParamCType::new(address(fields)?, string(fields, "idx")?, data_type(fields)?);
    if let Some(order) = byte_order(fields)? {
        param = param.with_byte_order(order);
    }
    if let Some(order) = word_order(fields)? {
        param = param.with_word_order(order);
    }
    if let Some(block) = block_of(fields) {
        param = param.with_block(block);
    }
    Ok(param.into())
}

fn build_ctype_scale(fields: &ValueMap) -> Result<Parameter> {
    ensure_known(
        fields,
        "ParamCTypeScale",
        &[
            "address",
            "idx",
            "data_type",
            "byte_order",
            "word_order",
            "scale",
            "significant_figures",
            "block",
        ],
    )?;
    let mut param =
        ParamCTypeScale::new(address(fields)?, string(fields, "idx")?, data_type(fields)?);
    if let Some(order) = byte_order(fields)? {
        param = param.with_byte_order(order);
    }
    if let Some(order) = word_order(fields)? {
        param = param.with_word_order(order);
    }
    if let Some(scale) = opt_f64(fields, "scale")? {
        param = param.with_scale(scale);
    }
    if let Some(figures) = opt_u32(fields, "significant_figures")? {
        param = param.with_significant_figures(figures);
    }
    if let Some(block) = block_of(fields) {
        param = param.with_block(block);
    }
    Ok(param.into())
}

fn build_ctype_scale_modulus(fields: &ValueMap) -> Result<Parameter> {
    ensure_known(
        fields,
        "ParamCTypeScaleModulus",
        &[
            "address",
            "idx",
            "data_type",
            "byte_order",
            "word_order",
            "scale",
            "significant_figures",
            "modulus",
            "invert_on_overflow",
            "block",
        ],
    )?;
    let mut param = ParamCTypeScaleModulus::new(
        address(fields)?,
        string(fields, "idx")?,
        data_type(fields)?,
        req_i64(fields, "modulus")?,
    );
    if let Some(order) = byte_order(fields)? {
        param = param.with_byte_order(order);
    }
    if let Some(order) = word_order(fields)? {
        param = param.with_word_order(order);
    }
    if let Some(scale) = opt_f64(fields, "scale")? {
        param = param.with_scale(scale);
    }
    if let Some(figures) = opt_u32(fields, "significant_figures")? {
        param = param.with_significant_figures(figures);
    }
    if let Some(invert) = opt_bool(fields, "invert_on_overflow")? {
        param = param.with_invert_on_overflow(invert);
    }
    if let Some(block) = block_of(fields) {
        param = param.with_block(block);
    }
    Ok(param.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address_map::{AddressMap, Registers};
    use std::io::Write;

    fn parse_yaml(text: &str) -> ValueMap {
        let yaml: serde_yaml::Value = serde_yaml::from_str(text).unwrap();
        match yaml_to_value(&yaml).unwrap() {
            Value::Object(obj) => obj,
            other => panic!("expected a mapping, got {:?}", other),
        }
    }

    fn meta_from(json: serde_json::Value) -> ValueMap {
        match Value::from(json) {
            Value::Object(obj) => obj,
            other => panic!("expected an object, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_full_schema() {
        let parameters = parse_yaml(
            r#"
speed:
  form:
    type: Param
    address: 1
    idx: speed
    scale: 0.1
temp:
  form:
    type: ParamMask
    address: 5
    idx: temp
    mask: 0x0FF0
    rshift: 4
name:
  form:
    type: ParamText
    address: 10
    idx: name
    length: 4
flags:
  form:
    type: ParamBits
    address: 20
    bitmask:
      running: 0
      fault: 1
state:
  form:
    type: ParamLookup
    address: 30
    idx: state
    table:
      0: stopped
      0x10: running
flow:
  form:
    type: ParamCTypeScale
    address: 40
    idx: flow
    data_type: float
    scale: 0.5
kind:
  form:
    type: ParamStatic
    idx: kind
    value: meter
"#,
        );
        let params = parse_data_types(&parameters, &ValueMap::new());
        assert_eq!(params.len(), 7);
        assert!(matches!(params["speed"], Parameter::Plain(_)));
        assert!(matches!(params["temp"], Parameter::Mask(_)));
        assert!(matches!(params["name"], Parameter::Text(_)));
        assert!(matches!(params["flags"], Parameter::Bits(_)));
        assert!(matches!(params["flow"], Parameter::CTypeScale(_)));
        assert!(matches!(params["kind"], Parameter::Static(_)));

        if let Parameter::Lookup(lookup) = &params["state"] {
            assert_eq!(lookup.table[&0x10], "running");
        } else {
            panic!("state should be a lookup parameter");
        }

        let mut registers = AddressMap::new();
        registers.set(5, 0x1230).unwrap();
        let data = params["temp"].decode(&registers, None);
        assert_eq!(data["temp"], Value::Integer(35));
    }

    #[test_log::test]
    fn test_malformed_entries_skipped() {
        let parameters = parse_yaml(
            r#"
good:
  form:
    type: Param
    address: 1
    idx: good
exotic:
  form:
    type: ParamQuantum
    address: 2
    idx: exotic
formless:
  source: holding
no_idx:
  form:
    type: Param
    address: 3
"#,
        );
        let params = parse_data_types(&parameters, &ValueMap::new());
        assert_eq!(params.len(), 1);
        assert!(params.contains_key("good"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let parameters = parse_yaml(
            r#"
speed:
  form:
    type: Param
    address: 1
    idx: speed
    scal: 0.1
"#,
        );
        let params = parse_data_types(&parameters, &ValueMap::new());
        assert!(params.is_empty());
    }

    #[test]
    fn test_negative_address_rejected() {
        let parameters = parse_yaml(
            r#"
speed:
  form:
    type: Param
    address: -1
    idx: speed
"#,
        );
        let params = parse_data_types(&parameters, &ValueMap::new());
        assert!(params.is_empty());
    }

    #[test]
    fn test_ref_param_resolution() {
        let parameters = parse_yaml(
            r#"
speed:
  form:
    type: Param
    idx: speed
    address:
      type: ref_param
      param: base_address
      offset: 5
"#,
        );
        let meta = meta_from(serde_json::json!({ "base_address": 100 }));
        let params = parse_data_types(&parameters, &meta);
        if let Parameter::Plain(param) = &params["speed"] {
            assert_eq!(param.address, 105);
        } else {
            panic!("speed should be a plain parameter");
        }
    }

    #[test]
    fn test_ref_param_null_ref() {
        let meta = meta_from(serde_json::json!({ "serial": 0xFFFF }));
        let reference = parse_yaml(
            r#"
type: ref_param
param: serial
null_ref: 0xFFFF
"#,
        );
        assert_eq!(resolve_param(&reference, &meta).unwrap(), Value::Null);
    }

    #[test]
    fn test_resolve_param_errors() {
        let meta = meta_from(serde_json::json!({ "name": "pump", "base": 10 }));

        let unknown = parse_yaml("type: teleport\nparam: name\n");
        assert!(resolve_param(&unknown, &meta).is_err());

        let missing = parse_yaml("type: ref_param\nparam: absent\n");
        assert!(resolve_param(&missing, &meta).is_err());

        let bad_offset = parse_yaml("type: ref_param\nparam: base\noffset: up\n");
        assert!(resolve_param(&bad_offset, &meta).is_err());

        // A non numeric referenced value ignores the offset entirely.
        let text_ref = parse_yaml("type: ref_param\nparam: name\noffset: 3\n");
        assert_eq!(
            resolve_param(&text_ref, &meta).unwrap(),
            Value::from("pump")
        );
    }

    #[test]
    fn test_nested_resolution() {
        let fields = parse_yaml(
            r#"
table:
  "1":
    type: ref_param
    param: label
limits:
  - 1
  - type: value
    value: 99
"#,
        );
        let meta = meta_from(serde_json::json!({ "label": "running" }));
        let resolved = resolve_param_dict(&fields, &meta).unwrap();
        let table = resolved["table"].as_object().unwrap();
        assert_eq!(table["1"], Value::from("running"));
        let limits = resolved["limits"].as_array().unwrap();
        assert_eq!(limits, &[Value::Integer(1), Value::Integer(99)]);
    }

    #[test]
    fn test_parse_by_source() {
        let parameters = parse_yaml(
            r#"
speed:
  source: holding
  form:
    type: Param
    address: 1
    idx: speed
temp:
  source: input
  form:
    type: Param
    address: 2
    idx: temp
orphan:
  form:
    type: Param
    address: 3
    idx: orphan
"#,
        );
        let by_source = parse_data_types_by_source(&parameters, &ValueMap::new());
        assert_eq!(by_source.len(), 2);
        assert!(by_source["holding"].contains_key("speed"));
        assert!(by_source["input"].contains_key("temp"));
    }

    #[test_log::test]
    fn test_resolve_static_data_types() {
        let parameters = parse_yaml(
            r#"
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
broken:
  source: static
  form:
    type: ref_param
    param: absent
speed:
  source: holding
  form:
    type: Param
    address: 1
    idx: speed
"#,
        );
        let meta = meta_from(serde_json::json!({ "serial_number": 1234 }));
        let resolved = resolve_static_data_types(&parameters, &meta);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved["serial"], Value::Integer(1234));
        assert_eq!(resolved["model"], Value::from("PR-9000"));
    }

    #[test]
    fn test_yaml_key_forms() {
        let object = parse_yaml(
            r#"
0x10: hex
7: decimal
true: flag
plain: text
"#,
        );
        assert_eq!(object["16"], Value::from("hex"));
        assert_eq!(object["7"], Value::from("decimal"));
        assert_eq!(object["true"], Value::from("flag"));
        assert_eq!(object["plain"], Value::from("text"));
    }

    #[test]
    fn test_build_from_device_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(
            br#"
parameters:
  speed:
    form:
      type: Param
      address: 1
      idx: speed
      scale: 0.1
  name:
    form:
      type: ParamText
      address: 10
      idx: name
      length: 2
"#,
        )
        .unwrap();

        let params = build_from_device_config(&path).unwrap();
        assert_eq!(params.len(), 2);

        let mut registers = AddressMap::new();
        registers.set(1, 250).unwrap();
        let data = params["speed"].decode(&registers, None);
        assert_eq!(data["speed"], Value::Float(25.0));
    }

    #[test]
    fn test_build_from_device_config_missing_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"transport: modbus\n").unwrap();

        assert!(matches!(
            build_from_device_config(&path),
            Err(Error::Schema(_))
        ));
    }
}
