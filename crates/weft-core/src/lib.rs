#![forbid(unsafe_code)]

//! Core description types for weft.
//!
//! This crate provides:
//! - [`Element`] and [`create_element`] for immutable element descriptions
//! - [`Props`] with typed attributes and [`Listener`]s, plus [`PropsDiff`]
//! - [`Scope`] and [`StateSetter`] for component state
//! - [`HostAdapter`], the contract a rendering surface implements

pub mod element;
pub mod hooks;
pub mod host;
pub mod props;

pub use element::{
    Child, Children, Component, Element, ElementBuilder, ElementType, TEXT_VALUE_ATTR,
    create_element, create_text_element,
};
pub use hooks::{HookSlot, RestartSignal, Scope, StateSetter};
pub use host::{HostAdapter, HostKind};
pub use props::{Event, Listener, PropValue, Props, PropsDiff};
