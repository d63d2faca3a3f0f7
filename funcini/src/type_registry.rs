//! type registry: the C types referenced by function signatures, keyed by a
//! content hash so the same type seen in two compilation units is stored once
use serde::Serialize;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeKind {
    /// int, float, uint8_t, void, ...
    Base { name: String },

    Struct { name: String },

    Union { name: String },

    Enum { name: String },

    /// kept by name, the aliased type is never expanded
    Typedef { name: String },

    /// one entry per dimension, None when unbounded
    Array {
        element: TypeId,
        dimensions: Vec<Option<u64>>,
    },

    /// function type, usually behind a pointer (callbacks)
    Function {
        return_type: TypeId,
        parameters: Vec<TypeId>, // order matters
        is_variadic: bool,
    },
}

/// cv-qualifiers of a base type or of one pointer level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Qualifiers {
    pub is_const: bool,
    pub is_volatile: bool,
}

impl Qualifiers {
    fn is_empty(&self) -> bool {
        !self.is_const && !self.is_volatile
    }

    fn keywords(&self) -> &'static str {
        match (self.is_const, self.is_volatile) {
            (true, true) => "const volatile",
            (true, false) => "const",
            (false, true) => "volatile",
            (false, false) => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Type {
    pub kind: TypeKind,
    /// qualifiers of the pointed-to (or plain) type
    pub qualifiers: Qualifiers,
    /// one entry per pointer level, innermost first. `char* const` is a
    /// `char` with one const pointer level, `const char*` a const `char`
    /// with one plain level.
    pub pointers: Vec<Qualifiers>,
}

impl Type {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            qualifiers: Qualifiers::default(),
            pointers: Vec::new(),
        }
    }

    pub fn void() -> Self {
        Self::new(TypeKind::Base {
            name: "void".to_string(),
        })
    }

    /// `depth` unqualified pointer levels
    pub fn with_pointer_depth(mut self, depth: usize) -> Self {
        self.pointers = vec![Qualifiers::default(); depth];
        self
    }

    /// one more pointer level on top, itself qualified
    pub fn with_pointer(mut self, qualifiers: Qualifiers) -> Self {
        self.pointers.push(qualifiers);
        self
    }

    pub fn with_const(mut self) -> Self {
        self.qualifiers.is_const = true;
        self
    }

    pub fn with_volatile(mut self) -> Self {
        self.qualifiers.is_volatile = true;
        self
    }

    pub fn pointer_depth(&self) -> usize {
        self.pointers.len()
    }

    fn prefix(&self) -> String {
        if self.qualifiers.is_empty() {
            String::new()
        } else {
            format!("{} ", self.qualifiers.keywords())
        }
    }

    // `*`, `* const`, `* const*`, ...
    fn stars(&self) -> String {
        let mut stars = String::new();
        for level in &self.pointers {
            stars.push('*');
            if !level.is_empty() {
                stars.push(' ');
                stars.push_str(level.keywords());
            }
        }
        stars
    }
}

fn compute_type_id(type_: &Type) -> TypeId {
    use bincode::Options;
    use std::collections::hash_map::DefaultHasher;

    let bytes = bincode::DefaultOptions::new()
        .with_fixint_encoding() // stable integer encoding
        .serialize(type_)
        .expect("serialization cannot fail");

    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    TypeId(hasher.finish())
}

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<TypeId, Type>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// register a type and return its content-addressed id. registering an
    /// identical type again returns the existing id.
    pub fn register(&mut self, type_: Type) -> TypeId {
        let id = compute_type_id(&type_);
        if self.types.contains_key(&id) {
            log::trace!("type already registered with id {:016x}", id.0);
        } else {
            log::trace!("registered {} with id {:016x}", self.describe(&type_), id.0);
            self.types.insert(id, type_);
        }
        id
    }

    pub fn void_id(&mut self) -> TypeId {
        self.register(Type::void())
    }

    pub fn get(&self, id: TypeId) -> Option<&Type> {
        self.types.get(&id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// union another registry into this one (same id = same type)
    pub fn merge(&mut self, other: TypeRegistry) {
        let initial_count = self.len();
        let merging_count = other.len();

        for (id, type_) in other.types {
            self.types.entry(id).or_insert(type_);
        }

        let added = self.len() - initial_count;
        log::debug!(
            "merged type registry: {} types, {} new, {} duplicates",
            merging_count,
            added,
            merging_count - added
        );
    }

    /// C spelling of a type, e.g. `const char*`, `struct Point`, `int[4]`,
    /// `int (*)(const void*, const void*)`. unknown ids spell as `void`.
    pub fn c_name(&self, id: TypeId) -> String {
        match self.get(id) {
            Some(type_) => self.describe(type_),
            None => "void".to_string(),
        }
    }

    fn describe(&self, type_: &Type) -> String {
        let stars = type_.stars();
        let qualifiers = type_.prefix();

        match &type_.kind {
            TypeKind::Base { name } | TypeKind::Enum { name } | TypeKind::Typedef { name } => {
                format!("{}{}{}", qualifiers, name, stars)
            }
            TypeKind::Struct { name } => format!("{}struct {}{}", qualifiers, name, stars),
            TypeKind::Union { name } => format!("{}union {}{}", qualifiers, name, stars),
            TypeKind::Array {
                element,
                dimensions,
            } => {
                let mut s = format!("{}{}", qualifiers, self.c_name(*element));
                for dim in dimensions {
                    match dim {
                        Some(count) => s.push_str(&format!("[{}]", count)),
                        None => s.push_str("[]"),
                    }
                }
                s.push_str(&stars);
                s
            }
            TypeKind::Function {
                return_type,
                parameters,
                is_variadic,
            } => {
                let mut params: Vec<String> =
                    parameters.iter().map(|p| self.c_name(*p)).collect();
                if *is_variadic {
                    params.push("...".to_string());
                }
                let params = if params.is_empty() {
                    "void".to_string()
                } else {
                    params.join(", ")
                };

                let ret = self.c_name(*return_type);
                if stars.is_empty() {
                    format!("{}({})", ret, params)
                } else {
                    format!("{} ({})({})", ret, stars, params)
                }
            }
        }
    }
}
