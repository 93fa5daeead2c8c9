//! Type descriptors and their fluent builder
//!
//! A descriptor records the statically registered shape of one type: its kind,
//! its base type, the members it declares and its constructors.
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

use super::{SimpleKind, TypeKey, TypeKind};

/// Accessibility of a declared member or constructor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Private,
}

/// How a declared member is accessed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberShape {
    /// A plain field, optionally read-only
    Field { readonly: bool },
    /// A property with optional getter and setter
    Property { get: bool, set: bool },
    /// A method; getter/setter conventions are applied during discovery
    Method {
        parameters: Vec<TypeKey>,
        returns: Option<TypeKey>,
    },
}

/// A member as declared on a type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberDeclaration {
    pub name: String,
    pub value_type: TypeKey,
    pub shape: MemberShape,
    pub visibility: Visibility,
}

impl MemberDeclaration {
    /// Whether the member is public
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }
}

/// A single constructor parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterDeclaration {
    pub name: String,
    pub value_type: TypeKey,
    /// Optional parameters have a default and never block construction
    pub optional: bool,
}

/// A declared constructor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstructorDeclaration {
    pub parameters: Vec<ParameterDeclaration>,
    pub visibility: Visibility,
}

/// The registered shape of a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub key: TypeKey,
    pub kind: TypeKind,
    pub base: Option<TypeKey>,
    pub members: Vec<MemberDeclaration>,
    pub constructors: Vec<ConstructorDeclaration>,
    pub is_abstract: bool,
}

impl TypeDescriptor {
    /// Start building a complex (class-like) type
    pub fn complex(name: impl Into<TypeKey>) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder::new(name.into(), TypeKind::Complex)
    }

    /// Describe a simple value type
    pub fn simple(name: impl Into<TypeKey>, kind: SimpleKind) -> TypeDescriptor {
        TypeDescriptorBuilder::new(name.into(), TypeKind::Simple(kind)).build()
    }

    /// Describe a growable collection of `element`
    pub fn enumerable(name: impl Into<TypeKey>, element: impl Into<TypeKey>) -> TypeDescriptor {
        TypeDescriptorBuilder::new(
            name.into(),
            TypeKind::Enumerable {
                element: element.into(),
            },
        )
        .build()
    }

    /// Describe a fixed-size array of `element`
    pub fn array(name: impl Into<TypeKey>, element: impl Into<TypeKey>) -> TypeDescriptor {
        TypeDescriptorBuilder::new(
            name.into(),
            TypeKind::Array {
                element: element.into(),
            },
        )
        .build()
    }

    /// Describe a string-keyed dictionary of `value`
    pub fn dictionary(name: impl Into<TypeKey>, value: impl Into<TypeKey>) -> TypeDescriptor {
        TypeDescriptorBuilder::new(
            name.into(),
            TypeKind::Dictionary {
                value: value.into(),
            },
        )
        .build()
    }

    /// Public constructors, greediest first; declaration order breaks ties
    pub fn public_constructors(&self) -> Vec<&ConstructorDeclaration> {
        let mut constructors: Vec<_> = self
            .constructors
            .iter()
            .filter(|c| c.visibility == Visibility::Public)
            .collect();
        constructors.sort_by(|a, b| b.parameters.len().cmp(&a.parameters.len()));
        constructors
    }
}

/// Builder for type descriptors
#[derive(Debug)]
pub struct TypeDescriptorBuilder {
    key: TypeKey,
    kind: TypeKind,
    base: Option<TypeKey>,
    members: Vec<MemberDeclaration>,
    constructors: Vec<ConstructorDeclaration>,
    is_abstract: bool,
}

impl TypeDescriptorBuilder {
    fn new(key: TypeKey, kind: TypeKind) -> Self {
        Self {
            key,
            kind,
            base: None,
            members: Vec::new(),
            constructors: Vec::new(),
            is_abstract: false,
        }
    }

    /// Set the base type
    pub fn base(mut self, base: impl Into<TypeKey>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Mark the type as abstract (never constructed directly)
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Add any member declaration
    pub fn member(mut self, member: MemberDeclaration) -> Self {
        self.members.push(member);
        self
    }

    /// Add a public read/write property
    pub fn property(self, name: &str, value_type: impl Into<TypeKey>) -> Self {
        self.public(name, value_type, MemberShape::Property { get: true, set: true })
    }

    /// Add a public get-only property
    pub fn read_only_property(self, name: &str, value_type: impl Into<TypeKey>) -> Self {
        self.public(name, value_type, MemberShape::Property { get: true, set: false })
    }

    /// Add a public set-only property
    pub fn write_only_property(self, name: &str, value_type: impl Into<TypeKey>) -> Self {
        self.public(name, value_type, MemberShape::Property { get: false, set: true })
    }

    /// Add a public mutable field
    pub fn field(self, name: &str, value_type: impl Into<TypeKey>) -> Self {
        self.public(name, value_type, MemberShape::Field { readonly: false })
    }

    /// Add a public read-only field
    pub fn read_only_field(self, name: &str, value_type: impl Into<TypeKey>) -> Self {
        self.public(name, value_type, MemberShape::Field { readonly: true })
    }

    /// Add a private property, which discovery never sees
    pub fn private_property(mut self, name: &str, value_type: impl Into<TypeKey>) -> Self {
        self.members.push(MemberDeclaration {
            name: name.to_string(),
            value_type: value_type.into(),
            shape: MemberShape::Property { get: true, set: true },
            visibility: Visibility::Private,
        });
        self
    }

    /// Add a public method
    pub fn method(
        self,
        name: &str,
        parameters: &[&str],
        returns: Option<&str>,
    ) -> Self {
        let shape = MemberShape::Method {
            parameters: parameters.iter().map(|p| TypeKey::new(p)).collect(),
            returns: returns.map(TypeKey::new),
        };
        let value_type = returns
            .map(TypeKey::new)
            .or_else(|| parameters.first().map(|p| TypeKey::new(p)))
            .unwrap_or_else(TypeKey::object);
        self.public(name, value_type, shape)
    }

    /// Add a public constructor; parameters are (name, type) pairs
    pub fn constructor(mut self, parameters: &[(&str, &str)]) -> Self {
        self.constructors.push(ConstructorDeclaration {
            parameters: parameters
                .iter()
                .map(|(name, value_type)| ParameterDeclaration {
                    name: name.to_string(),
                    value_type: TypeKey::new(value_type),
                    optional: false,
                })
                .collect(),
            visibility: Visibility::Public,
        });
        self
    }

    /// Add any constructor declaration
    pub fn constructor_declaration(mut self, constructor: ConstructorDeclaration) -> Self {
        self.constructors.push(constructor);
        self
    }

    fn public(mut self, name: &str, value_type: impl Into<TypeKey>, shape: MemberShape) -> Self {
        self.members.push(MemberDeclaration {
            name: name.to_string(),
            value_type: value_type.into(),
            shape,
            visibility: Visibility::Public,
        });
        self
    }

    /// Build the descriptor
    pub fn build(self) -> TypeDescriptor {
        TypeDescriptor {
            key: self.key,
            kind: self.kind,
            base: self.base,
            members: self.members,
            constructors: self.constructors,
            is_abstract: self.is_abstract,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_records_members_in_order() {
        let descriptor = TypeDescriptor::complex("Person")
            .property("Name", "String")
            .read_only_field("Id", "I32")
            .method("GetAge", &[], Some("I32"))
            .build();

        let names: Vec<_> = descriptor.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Name", "Id", "GetAge"]);
        assert_eq!(descriptor.members[1].shape, MemberShape::Field { readonly: true });
        assert_eq!(descriptor.members[2].value_type, TypeKey::new("I32"));
    }

    #[test]
    fn test_setter_method_value_type_is_parameter() {
        let descriptor = TypeDescriptor::complex("Person")
            .method("SetName", &["String"], None)
            .build();
        assert_eq!(descriptor.members[0].value_type, TypeKey::new("String"));
    }

    #[test]
    fn test_public_constructors_greediest_first() {
        let descriptor = TypeDescriptor::complex("Point")
            .constructor(&[])
            .constructor(&[("x", "I32"), ("y", "I32")])
            .constructor_declaration(ConstructorDeclaration {
                parameters: vec![ParameterDeclaration {
                    name: "seed".to_string(),
                    value_type: TypeKey::new("I64"),
                    optional: false,
                }],
                visibility: Visibility::Private,
            })
            .build();

        let constructors = descriptor.public_constructors();
        assert_eq!(constructors.len(), 2);
        assert_eq!(constructors[0].parameters.len(), 2);
        assert!(constructors[1].parameters.is_empty());
    }
}
