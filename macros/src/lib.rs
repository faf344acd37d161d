//! Derive macros for the Todoflow framework
//!
//! This crate provides procedural macros to reduce boilerplate when building
//! reducer-driven applications with Todoflow.
//!
//! # Available Macros
//!
//! - `#[derive(Action)]` - Classifies action enum variants and names them
//!
//! # Example
//!
//! ```ignore
//! use todoflow_macros::Action;
//!
//! #[derive(Action, Clone, Debug)]
//! enum TodoAction {
//!     #[command]
//!     TodoDeleteRequested { id: i64 },
//!
//!     #[event]
//!     InfoMessageSet { message: String },
//!
//!     #[signal]
//!     ActivateTodoControls,
//! }
//!
//! assert!(TodoAction::TodoDeleteRequested { id: 1 }.is_command());
//! assert!(TodoAction::ActivateTodoControls.is_signal());
//! assert_eq!(TodoAction::ActivateTodoControls.action_type(), "ActivateTodoControls");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Ident};

/// Kind of action a variant represents
#[derive(Clone, Copy, PartialEq, Eq)]
enum Kind {
    Command,
    Event,
    Signal,
}

impl Kind {
    const ALL: [(Self, &'static str); 3] = [
        (Self::Command, "command"),
        (Self::Event, "event"),
        (Self::Signal, "signal"),
    ];
}

/// Derive macro for Action enums
///
/// Generates helper methods for action enums:
/// - `is_command()` - Returns true if this variant asks for work to be done
/// - `is_event()` - Returns true if this variant reports an outcome
/// - `is_signal()` - Returns true if this variant is a UI-only signal
/// - `action_type()` - Returns the variant name, for logs and metrics labels
///
/// # Attributes
///
/// - `#[command]` - Mark a variant as a command (request)
/// - `#[event]` - Mark a variant as an event (outcome of an effect)
/// - `#[signal]` - Mark a variant as a UI signal
///
/// Unmarked variants answer `false` to every predicate.
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if:
/// - Applied to a non-enum type
/// - A variant carries more than one of the kind attributes
#[proc_macro_derive(Action, attributes(command, event, signal))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(input, "#[derive(Action)] can only be used on enums")
            .to_compile_error()
            .into();
    };

    let mut classified: Vec<(Kind, proc_macro2::TokenStream)> = Vec::new();
    let mut type_arms = Vec::new();

    for variant in &data_enum.variants {
        let kinds: Vec<Kind> = Kind::ALL
            .iter()
            .filter(|(_, attr)| has_attribute(&variant.attrs, attr))
            .map(|(kind, _)| *kind)
            .collect();

        if kinds.len() > 1 {
            return syn::Error::new_spanned(
                variant,
                "Variant can carry only one of #[command], #[event] or #[signal]",
            )
            .to_compile_error()
            .into();
        }

        let pattern = variant_pattern(&variant.ident, &variant.fields);
        let type_name = variant.ident.to_string();
        type_arms.push(quote! { #pattern => #type_name, });

        if let Some(kind) = kinds.first() {
            classified.push((*kind, pattern));
        }
    }

    let arms_for = |wanted: Kind| {
        classified
            .iter()
            .filter(move |(kind, _)| *kind == wanted)
            .map(|(_, pattern)| quote! { #pattern => true, })
            .collect::<Vec<_>>()
    };
    let command_arms = arms_for(Kind::Command);
    let event_arms = arms_for(Kind::Event);
    let signal_arms = arms_for(Kind::Signal);

    let expanded = quote! {
        impl #name {
            /// Returns true if this action is a command
            #[must_use]
            #[allow(unreachable_patterns)]
            pub const fn is_command(&self) -> bool {
                match self {
                    #(#command_arms)*
                    _ => false,
                }
            }

            /// Returns true if this action is an event
            #[must_use]
            #[allow(unreachable_patterns)]
            pub const fn is_event(&self) -> bool {
                match self {
                    #(#event_arms)*
                    _ => false,
                }
            }

            /// Returns true if this action is a UI signal
            #[must_use]
            #[allow(unreachable_patterns)]
            pub const fn is_signal(&self) -> bool {
                match self {
                    #(#signal_arms)*
                    _ => false,
                }
            }

            /// Returns the variant name of this action
            #[must_use]
            pub const fn action_type(&self) -> &'static str {
                match self {
                    #(#type_arms)*
                }
            }
        }
    };

    TokenStream::from(expanded)
}

/// Builds a pattern matching any value of the variant
fn variant_pattern(variant: &Ident, fields: &Fields) -> proc_macro2::TokenStream {
    match fields {
        Fields::Named(_) => quote! { Self::#variant { .. } },
        Fields::Unnamed(_) => quote! { Self::#variant(..) },
        Fields::Unit => quote! { Self::#variant },
    }
}

/// Helper function to check if an attribute list contains a specific attribute
fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}

#[cfg(test)]
mod tests {
    // Macro tests live in the tests/ directory
}
