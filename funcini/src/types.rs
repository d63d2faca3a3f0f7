use crate::type_registry::{TypeId, TypeRegistry};

/// c function parameters have a name and a type
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub type_id: TypeId,
}

/// a function as found in the debug info
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    pub name: String,
    /// DW_AT_low_pc, when the compiler emitted one
    pub address: Option<u64>,
    pub return_type_id: TypeId,
    pub parameters: Vec<Parameter>,
    pub is_variadic: bool,
    pub is_exported: bool,
}

impl FunctionSignature {
    /// C-style declaration, e.g. `int add(int a, int b)`
    pub fn prototype(&self, registry: &TypeRegistry) -> String {
        let params = if self.parameters.is_empty() && !self.is_variadic {
            "void".to_string()
        } else {
            let mut param_strings: Vec<String> = self
                .parameters
                .iter()
                .map(|p| {
                    let type_str = registry.c_name(p.type_id);
                    if p.name.is_empty() {
                        type_str
                    } else {
                        format!("{} {}", type_str, p.name)
                    }
                })
                .collect();

            if self.is_variadic {
                param_strings.push("...".to_string());
            }
            param_strings.join(", ")
        };

        format!(
            "{} {}({})",
            registry.c_name(self.return_type_id),
            self.name,
            params
        )
    }
}
