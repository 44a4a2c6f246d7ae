//! # itx-dispatch
//!
//! Handler registry and the transport-independent dispatcher. Both front doors
//! (HTTPS webhook and gateway) feed interactions into a [`Dispatcher`] together
//! with a [`Responder`] that knows how the initial reply travels back.

pub mod context;
pub mod dispatcher;
pub mod registry;
pub mod responder;
pub mod waiter;

#[cfg(test)]
mod test_support;

pub use context::{CommandContext, ComponentContext, ModalContext};
pub use dispatcher::{Dispatcher, PostCommandHook, PreCommandHook, Routing};
pub use registry::{
    autocomplete_handler, command_handler, component_handler, modal_handler, AutocompleteHandler,
    CommandEntry, CommandFilter, CommandHandler, ComponentHandler, HandlerRegistry, ModalHandler,
    SUBCOMMAND_SEPARATOR,
};
pub use responder::{HttpResponder, Responder, RestResponder};
pub use waiter::{Cleanup, Waiter};
