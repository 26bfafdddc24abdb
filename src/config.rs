//! The embedded configuration object: a `(global_name, values)` pair whose
//! schema may be unknown to the receiver. Unknown schemas are inferred from
//! the wire shape on first sight ("creative mode"), registered under a
//! process-global name, and bound on every subsequent decode.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::error::{CodecError, ConfigError};
use crate::packer::{Packer, Unpacker};

/// The literal `global_name` an absent/null config serializes as.
pub const NULL_CONFIG_NAME: &str = "<nullconfig>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Boolean,
    Integer,
    Float,
    String,
    /// A filesystem path, wire-identical to `String` (both pack/bind as
    /// CBOR text) but kept as a distinct schema type so a descriptor can
    /// still tell a path field from a free-text one.
    File,
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub description: String,
}

/// A registered (or locally built, not-yet-registered) config schema:
/// field names and types in encounter order.
#[derive(Debug, Clone)]
pub struct ConfigDescriptor {
    pub global_name: String,
    pub fields: Vec<FieldDescriptor>,
    registered: bool,
}

impl ConfigDescriptor {
    pub fn new(global_name: impl Into<String>) -> Self {
        Self {
            global_name: global_name.into(),
            fields: Vec::new(),
            registered: false,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            field_type,
            description: "(no description)".to_string(),
        });
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Boolean(bool),
    Integer(i64),
    Float(f32),
    String(String),
    File(String),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Boolean(_) => FieldType::Boolean,
            FieldValue::Integer(_) => FieldType::Integer,
            FieldValue::Float(_) => FieldType::Float,
            FieldValue::String(_) => FieldType::String,
            FieldValue::File(_) => FieldType::File,
        }
    }
}

/// A config instance: a schema name plus an ordered set of bound values.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigObject {
    pub global_name: String,
    values: Vec<(String, FieldValue)>,
}

impl ConfigObject {
    pub fn new(global_name: impl Into<String>) -> Self {
        Self {
            global_name: global_name.into(),
            values: Vec::new(),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        self.values.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn values(&self) -> &[(String, FieldValue)] {
        &self.values
    }

    pub fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        p.str(&self.global_name)?;
        p.map_start(self.values.len() as u64)?;
        for (name, value) in &self.values {
            p.str(name)?;
            match value {
                FieldValue::Boolean(b) => p.boolean(*b)?,
                FieldValue::Integer(i) => p.int(*i)?,
                FieldValue::Float(f) => p.float(*f)?,
                FieldValue::String(s) | FieldValue::File(s) => p.str(s)?,
            }
        }
        Ok(())
    }

    /// Packs `None` as the literal `<nullconfig>` name followed by an empty
    /// map, matching the source's representation of an absent OPEN config.
    pub fn pack_opt(config: Option<&ConfigObject>, p: &mut Packer) -> Result<(), CodecError> {
        match config {
            Some(c) => c.pack(p),
            None => {
                p.str(NULL_CONFIG_NAME)?;
                p.map_start(0)?;
                Ok(())
            }
        }
    }

    pub fn unpack(u: &mut Unpacker<'_>, registry: &SchemaRegistry) -> Result<Self, ConfigError> {
        let global_name = u.str().map_err(ConfigError::from)?;
        Self::unpack_with_name(global_name, u, registry)
    }

    pub fn unpack_opt(
        u: &mut Unpacker<'_>,
        registry: &SchemaRegistry,
    ) -> Result<Option<Self>, ConfigError> {
        let global_name = u.str().map_err(ConfigError::from)?;
        if global_name == NULL_CONFIG_NAME {
            let npairs = u.map_start().map_err(ConfigError::from)?;
            for _ in 0..(npairs * 2) {
                u.skip_value().map_err(ConfigError::from)?;
            }
            return Ok(None);
        }
        Self::unpack_with_name(global_name, u, registry).map(Some)
    }

    fn unpack_with_name(
        global_name: String,
        u: &mut Unpacker<'_>,
        registry: &SchemaRegistry,
    ) -> Result<Self, ConfigError> {
        let desc = match registry.lookup(&global_name) {
            Some(desc) => desc,
            None => {
                // Creative mode: probe a loaned, non-advancing view of the
                // remaining buffer to infer a schema, then register it.
                let probe = *u;
                let fields = probe_schema(probe)?;
                let new_desc = ConfigDescriptor {
                    global_name: global_name.clone(),
                    fields,
                    registered: false,
                };
                let desc = registry.register(new_desc)?;
                tracing::info!(
                    global_name = %global_name,
                    field_count = desc.fields.len(),
                    "registered config schema via creative mode"
                );
                desc
            }
        };

        let npairs = u.map_start().map_err(ConfigError::from)?;
        let mut values = Vec::with_capacity(npairs as usize);
        for _ in 0..npairs {
            let field_name = u.str().map_err(ConfigError::from)?;
            let field = desc
                .field(&field_name)
                .ok_or_else(|| ConfigError::UnknownField {
                    field: field_name.clone(),
                })?;
            let value = match field.field_type {
                FieldType::Boolean => FieldValue::Boolean(u.boolean().map_err(ConfigError::from)?),
                FieldType::Integer => FieldValue::Integer(u.int().map_err(ConfigError::from)?),
                FieldType::Float => FieldValue::Float(u.float().map_err(ConfigError::from)?),
                FieldType::String => FieldValue::String(u.str().map_err(ConfigError::from)?),
                FieldType::File => FieldValue::File(u.str().map_err(ConfigError::from)?),
            };
            values.push((field_name, value));
        }
        Ok(ConfigObject {
            global_name,
            values,
        })
    }
}


/// Walks a map once, inferring each field's type from the CBOR major type
/// (and, for major type 7, the additional-info subtype that distinguishes
/// bool from float) without binding any value. Operates on a loaned
/// `Unpacker` copy so the real read cursor never moves during the probe.
///
/// Text fields are always inferred as `FieldType::String`, never `File`:
/// the two wire-encode identically, so a schema seen for the first time
/// can't tell them apart. A `File` field only exists once someone builds
/// its descriptor by hand.
fn probe_schema(mut probe: Unpacker<'_>) -> Result<Vec<FieldDescriptor>, ConfigError> {
    use crate::packer::{ADDL_FALSE, ADDL_SINGLE, ADDL_TRUE, MAJOR_NINT, MAJOR_SIMPLE, MAJOR_TEXT, MAJOR_UINT};

    let npairs = probe.map_start().map_err(ConfigError::from)?;
    let mut fields = Vec::with_capacity(npairs as usize);
    for _ in 0..npairs {
        let name = probe.str().map_err(ConfigError::from)?;
        let (major, addl) = probe.peek_header().map_err(ConfigError::from)?;
        let field_type = if major == MAJOR_UINT || major == MAJOR_NINT {
            FieldType::Integer
        } else if major == MAJOR_TEXT {
            FieldType::String
        } else if major == MAJOR_SIMPLE && (addl == ADDL_FALSE || addl == ADDL_TRUE) {
            FieldType::Boolean
        } else if major == MAJOR_SIMPLE && addl == ADDL_SINGLE {
            FieldType::Float
        } else {
            return Err(ConfigError::UninferableFieldType { field: name });
        };
        probe.skip_value().map_err(ConfigError::from)?;
        fields.push(FieldDescriptor {
            name,
            field_type,
            description: "(no description)".to_string(),
        });
    }
    Ok(fields)
}

/// Process-global, append-only schema registry guarded by one mutex.
/// Contents outlive any individual decode call.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: Mutex<HashMap<String, Arc<ConfigDescriptor>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            schemas: Mutex::new(HashMap::new()),
        }
    }

    pub fn lookup(&self, global_name: &str) -> Option<Arc<ConfigDescriptor>> {
        self.schemas.lock().get(global_name).cloned()
    }

    /// Registers `desc` under its `global_name`. Fails with
    /// `SchemaCollision` rather than clobbering if another decode raced this
    /// one and registered the same name first — the registry is append-only,
    /// never overwritten.
    pub fn register(&self, mut desc: ConfigDescriptor) -> Result<Arc<ConfigDescriptor>, ConfigError> {
        let mut schemas = self.schemas.lock();
        if schemas.contains_key(&desc.global_name) {
            tracing::warn!(global_name = %desc.global_name, "schema registration collided with a concurrent decode");
            return Err(ConfigError::SchemaCollision {
                global_name: desc.global_name,
            });
        }
        desc.registered = true;
        let arc = Arc::new(desc);
        schemas.insert(arc.global_name.clone(), arc.clone());
        Ok(arc)
    }

    pub fn len(&self) -> usize {
        self.schemas.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

static GLOBAL_REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();

/// The process-wide schema registry used by [`ConfigObject::unpack`] when no
/// explicit registry is threaded through by the caller.
pub fn global_registry() -> &'static SchemaRegistry {
    GLOBAL_REGISTRY.get_or_init(SchemaRegistry::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_schema_roundtrip() {
        let registry = SchemaRegistry::new();
        let desc = ConfigDescriptor::new("qpsk.v1")
            .with_field("symbol_rate", FieldType::Integer)
            .with_field("enabled", FieldType::Boolean);
        registry.register(desc).unwrap();

        let mut cfg = ConfigObject::new("qpsk.v1");
        cfg.set("symbol_rate", FieldValue::Integer(9600));
        cfg.set("enabled", FieldValue::Boolean(true));

        let mut p = Packer::new();
        cfg.pack(&mut p).unwrap();
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        let decoded = ConfigObject::unpack(&mut u, &registry).unwrap();
        assert_eq!(decoded, cfg);
    }

    #[test]
    fn file_field_roundtrips_and_keeps_its_type_identity_in_a_known_schema() {
        let registry = SchemaRegistry::new();
        let desc = ConfigDescriptor::new("recorder.v1").with_field("output_path", FieldType::File);
        registry.register(desc).unwrap();

        let mut cfg = ConfigObject::new("recorder.v1");
        cfg.set("output_path", FieldValue::File("/tmp/capture.wav".to_string()));

        let mut p = Packer::new();
        cfg.pack(&mut p).unwrap();
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        let decoded = ConfigObject::unpack(&mut u, &registry).unwrap();
        assert_eq!(decoded, cfg);
        assert_eq!(decoded.get("output_path").unwrap().field_type(), FieldType::File);
    }

    #[test]
    fn creative_mode_infers_a_text_field_as_string_never_file() {
        let registry = SchemaRegistry::new();
        let mut cfg = ConfigObject::new("seen-first.v1");
        cfg.set("path", FieldValue::File("/etc/suscan.conf".to_string()));

        let mut p = Packer::new();
        cfg.pack(&mut p).unwrap();
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        let decoded = ConfigObject::unpack(&mut u, &registry).unwrap();
        // Same bytes, different type identity: creative mode can't tell a
        // path from a string, only a known schema can.
        assert_eq!(decoded.get("path").unwrap(), &FieldValue::String("/etc/suscan.conf".to_string()));

        let desc = registry.lookup("seen-first.v1").unwrap();
        assert_eq!(desc.field("path").unwrap().field_type, FieldType::String);
    }

    #[test]
    fn creative_mode_infers_types_and_registers_once() {
        let registry = SchemaRegistry::new();
        let mut cfg = ConfigObject::new("custom.v1");
        cfg.set("count", FieldValue::Integer(3));
        cfg.set("label", FieldValue::String("hi".to_string()));
        cfg.set("gain", FieldValue::Float(1.5));

        let mut p = Packer::new();
        cfg.pack(&mut p).unwrap();
        let bytes = p.into_bytes();

        let mut u1 = Unpacker::new(&bytes);
        let decoded1 = ConfigObject::unpack(&mut u1, &registry).unwrap();
        assert_eq!(decoded1, cfg);
        assert_eq!(registry.len(), 1);

        let mut u2 = Unpacker::new(&bytes);
        let decoded2 = ConfigObject::unpack(&mut u2, &registry).unwrap();
        assert_eq!(decoded2, cfg);
        assert_eq!(registry.len(), 1, "second decode must not re-register");

        let desc = registry.lookup("custom.v1").unwrap();
        let types: Vec<_> = desc.fields.iter().map(|f| f.field_type).collect();
        assert_eq!(
            types,
            vec![FieldType::Integer, FieldType::String, FieldType::Float]
        );
    }

    #[test]
    fn schema_collision_fails_current_decode() {
        let registry = SchemaRegistry::new();
        let winner = ConfigDescriptor::new("race.v1").with_field("x", FieldType::Integer);
        registry.register(winner).unwrap();

        let loser = ConfigDescriptor::new("race.v1").with_field("y", FieldType::String);
        let err = registry.register(loser).unwrap_err();
        assert_eq!(
            err,
            ConfigError::SchemaCollision {
                global_name: "race.v1".to_string()
            }
        );
    }

    #[test]
    fn schema_mismatch_is_rejected() {
        let registry = SchemaRegistry::new();
        let desc = ConfigDescriptor::new("typed.v1").with_field("flag", FieldType::Boolean);
        registry.register(desc).unwrap();

        // Wire carries a float where the schema declares a boolean.
        let mut p = Packer::new();
        p.str("typed.v1").unwrap();
        p.map_start(1).unwrap();
        p.str("flag").unwrap();
        p.float(1.0).unwrap();
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        let err = ConfigObject::unpack(&mut u, &registry).unwrap_err();
        assert!(matches!(err, ConfigError::Codec(_)));
    }

    #[test]
    fn null_config_roundtrips_to_none() {
        let registry = SchemaRegistry::new();
        let mut p = Packer::new();
        ConfigObject::pack_opt(None, &mut p).unwrap();
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        assert_eq!(ConfigObject::unpack_opt(&mut u, &registry).unwrap(), None);
    }

    #[test]
    fn some_config_roundtrips_through_opt() {
        let registry = SchemaRegistry::new();
        let mut cfg = ConfigObject::new("opt.v1");
        cfg.set("n", FieldValue::Integer(1));
        let mut p = Packer::new();
        ConfigObject::pack_opt(Some(&cfg), &mut p).unwrap();
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        assert_eq!(
            ConfigObject::unpack_opt(&mut u, &registry).unwrap(),
            Some(cfg)
        );
    }
}
