//! Shared test support utilities for integration tests

#![allow(dead_code)]

use graft_core::{Mapper, MappingPlan, MemberPopulation, TypeDescriptor, TypeKey, TypeRegistry};
use std::sync::Arc;

/// A small commerce domain with flattened, nested, collection, recursive and
/// constructor-only targets
pub fn commerce_registry() -> TypeRegistry {
    TypeRegistry::new()
        .with(TypeDescriptor::enumerable("List<Order>", "Order"))
        .with(TypeDescriptor::enumerable("List<OrderDto>", "OrderDto"))
        .with(TypeDescriptor::dictionary("Row", "String"))
        .with(
            TypeDescriptor::complex("Customer")
                .property("Id", "I32")
                .property("Name", "String")
                .property("Email", "String")
                .property("Address", "Address")
                .property("Orders", "List<Order>")
                .property("Manager", "Customer")
                .build(),
        )
        .with(
            TypeDescriptor::complex("Address")
                .property("Line1", "String")
                .property("City", "String")
                .build(),
        )
        .with(
            TypeDescriptor::complex("Order")
                .property("Sku", "String")
                .property("Quantity", "I32")
                .build(),
        )
        .with(
            TypeDescriptor::complex("CustomerDto")
                .property("Id", "I64")
                .property("Name", "String")
                .property("Email", "String")
                .property("AddressLine1", "String")
                .property("Address", "AddressDto")
                .property("Orders", "List<OrderDto>")
                .property("Manager", "CustomerDto")
                .property("Extra", "String")
                .build(),
        )
        .with(
            TypeDescriptor::complex("AddressDto")
                .property("Line1", "String")
                .property("City", "String")
                .build(),
        )
        .with(
            TypeDescriptor::complex("OrderDto")
                .property("Sku", "String")
                .property("Quantity", "I64")
                .build(),
        )
        .with(
            TypeDescriptor::complex("Contact")
                .read_only_property("Name", "String")
                .read_only_property("Email", "String")
                .constructor(&[("name", "String"), ("email", "String")])
                .constructor(&[])
                .build(),
        )
        .with(
            TypeDescriptor::complex("Account")
                .property("Name", "String")
                .constructor(&[("token", "String")])
                .build(),
        )
        .with(
            TypeDescriptor::complex("Node")
                .property("Value", "String")
                .property("Next", "Node")
                .build(),
        )
        .with(
            TypeDescriptor::complex("NodeDto")
                .property("Value", "String")
                .property("Next", "NodeDto")
                .build(),
        )
        .with(
            TypeDescriptor::complex("Legacy")
                .field("NameField", "String")
                .field("EmailField", "String")
                .build(),
        )
}

/// A mapper over [`commerce_registry`] with default settings
pub fn mapper() -> Mapper {
    Mapper::new(Arc::new(commerce_registry())).expect("default settings are valid")
}

pub fn key(name: &str) -> TypeKey {
    TypeKey::new(name)
}

/// Path of the first data source's source member, or an empty string
pub fn source_path(population: &MemberPopulation) -> String {
    population
        .data_sources
        .first()
        .and_then(|s| s.source_member())
        .map(|m| m.path())
        .unwrap_or_default()
}

/// Child plan of the population at `path`
pub fn child_plan<'a>(plan: &'a MappingPlan, path: &str) -> &'a MappingPlan {
    plan.population(path)
        .and_then(|p| p.data_sources.first())
        .and_then(|s| s.child_plan())
        .unwrap_or_else(|| panic!("no child plan at {path}"))
}
