//! Handler registry
//!
//! Commands are stored flat: roots under their name, subcommands under
//! `parent@child`. Components and modals each have a static space (handlers)
//! and a dynamic space (waiters); a custom id may live in at most one of them.
//! Every multi-key transaction holds the write lock for its whole span.

use futures::future::BoxFuture;
use itx_common::{ClientError, ClientResult};
use itx_core::{
    Choice, Command, CommandData, CommandOption, CommandType, InteractionContextType, OptionType,
    Snowflake,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::context::{CommandContext, ComponentContext, ModalContext};
use crate::waiter::{Cleanup, Waiter};

/// Separator between parent and subcommand names in registry keys
pub const SUBCOMMAND_SEPARATOR: char = '@';

pub type CommandHandler = Arc<dyn Fn(CommandContext) -> BoxFuture<'static, ()> + Send + Sync>;
pub type AutocompleteHandler = Arc<dyn Fn(&CommandContext) -> Vec<Choice> + Send + Sync>;
pub type ComponentHandler = Arc<dyn Fn(ComponentContext) -> BoxFuture<'static, ()> + Send + Sync>;
pub type ModalHandler = Arc<dyn Fn(ModalContext) -> BoxFuture<'static, ()> + Send + Sync>;

pub fn command_handler<F, Fut>(handler: F) -> CommandHandler
where
    F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(handler(ctx)))
}

pub fn autocomplete_handler<F>(handler: F) -> AutocompleteHandler
where
    F: Fn(&CommandContext) -> Vec<Choice> + Send + Sync + 'static,
{
    Arc::new(handler)
}

pub fn component_handler<F, Fut>(handler: F) -> ComponentHandler
where
    F: Fn(ComponentContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(handler(ctx)))
}

pub fn modal_handler<F, Fut>(handler: F) -> ModalHandler
where
    F: Fn(ModalContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(handler(ctx)))
}

/// A command definition together with its callbacks
#[derive(Clone)]
pub struct CommandEntry {
    pub command: Command,
    pub handler: CommandHandler,
    pub autocomplete: Option<AutocompleteHandler>,
}

impl CommandEntry {
    pub fn new(command: Command, handler: CommandHandler) -> Self {
        Self {
            command,
            handler,
            autocomplete: None,
        }
    }

    pub fn with_autocomplete(mut self, autocomplete: AutocompleteHandler) -> Self {
        self.autocomplete = Some(autocomplete);
        self
    }
}

impl std::fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEntry")
            .field("command", &self.command.name)
            .field("autocomplete", &self.autocomplete.is_some())
            .finish_non_exhaustive()
    }
}

/// Root command selection used when exporting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CommandFilter {
    #[default]
    All,
    /// Whitelist of root command names
    Only(Vec<String>),
    /// Blacklist of root command names
    Except(Vec<String>),
}

impl CommandFilter {
    pub fn allows(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.iter().any(|n| n == name),
            Self::Except(names) => !names.iter().any(|n| n == name),
        }
    }
}

/// Where a component or modal interaction should go
pub(crate) enum Route<H, T> {
    Static(H),
    Waiting(mpsc::Sender<T>),
    Missing,
}

struct Space<H, T> {
    handlers: HashMap<String, H>,
    waiters: HashMap<String, mpsc::Sender<T>>,
}

impl<H: Clone, T> Space<H, T> {
    fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            waiters: HashMap::new(),
        }
    }

    fn ensure_free(&self, custom_ids: &[String]) -> ClientResult<()> {
        match custom_ids
            .iter()
            .find(|id| self.handlers.contains_key(*id) || self.waiters.contains_key(*id))
        {
            Some(id) => Err(ClientError::CustomIdInUse(id.clone())),
            None => Ok(()),
        }
    }

    fn route(&self, custom_id: &str) -> Route<H, T> {
        if let Some(handler) = self.handlers.get(custom_id) {
            return Route::Static(handler.clone());
        }
        match self.waiters.get(custom_id) {
            Some(sender) => Route::Waiting(sender.clone()),
            None => Route::Missing,
        }
    }
}

struct RegistryState {
    commands: HashMap<String, CommandEntry>,
    components: Space<ComponentHandler, ComponentContext>,
    modals: Space<ModalHandler, ModalContext>,
}

fn components(state: &mut RegistryState) -> &mut Space<ComponentHandler, ComponentContext> {
    &mut state.components
}

fn modals(state: &mut RegistryState) -> &mut Space<ModalHandler, ModalContext> {
    &mut state.modals
}

/// Concurrent store of commands, component and modal handlers, and waiters
pub struct HandlerRegistry {
    application_id: Snowflake,
    default_contexts: RwLock<Vec<InteractionContextType>>,
    state: Arc<RwLock<RegistryState>>,
}

impl HandlerRegistry {
    pub fn new(application_id: Snowflake) -> Self {
        Self {
            application_id,
            default_contexts: RwLock::new(vec![InteractionContextType::Guild]),
            state: Arc::new(RwLock::new(RegistryState {
                commands: HashMap::new(),
                components: Space::new(),
                modals: Space::new(),
            })),
        }
    }

    /// Contexts given to commands registered without any
    pub fn with_default_contexts(self, contexts: Vec<InteractionContextType>) -> Self {
        self.set_default_contexts(contexts);
        self
    }

    /// Applies to commands registered from now on; an empty list is ignored
    pub fn set_default_contexts(&self, contexts: Vec<InteractionContextType>) {
        if !contexts.is_empty() {
            *self.default_contexts.write() = contexts;
        }
    }

    pub fn application_id(&self) -> Snowflake {
        self.application_id
    }

    fn fill_defaults(&self, command: &mut Command) {
        if command.kind.is_none() {
            command.kind = Some(CommandType::ChatInput);
        }
        if command.application_id.is_none() && !self.application_id.is_zero() {
            command.application_id = Some(self.application_id);
        }
        if command.contexts.as_ref().map_or(true, Vec::is_empty) {
            command.contexts = Some(self.default_contexts.read().clone());
        }
    }

    pub fn register_command(&self, mut entry: CommandEntry) -> ClientResult<()> {
        self.fill_defaults(&mut entry.command);
        let name = entry.command.name.clone();

        let mut state = self.state.write();
        if state.commands.contains_key(&name) {
            return Err(ClientError::DuplicateCommand(name));
        }

        tracing::debug!(command = %name, "Registered command");
        state.commands.insert(name, entry);
        Ok(())
    }

    /// Register a subcommand under an already registered root command
    pub fn register_subcommand(&self, mut entry: CommandEntry, parent: &str) -> ClientResult<()> {
        self.fill_defaults(&mut entry.command);
        let key = format!("{parent}{SUBCOMMAND_SEPARATOR}{}", entry.command.name);

        let mut state = self.state.write();
        if !state.commands.contains_key(parent) {
            return Err(ClientError::UnknownParent(parent.to_string()));
        }
        if state.commands.contains_key(&key) {
            return Err(ClientError::DuplicateSubCommand(key));
        }

        tracing::debug!(command = %key, "Registered subcommand");
        state.commands.insert(key, entry);
        Ok(())
    }

    /// Bind one handler to every given custom id; installs all or none
    pub fn register_component<I, S>(&self, custom_ids: I, handler: ComponentHandler) -> ClientResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let custom_ids: Vec<String> = custom_ids.into_iter().map(Into::into).collect();

        let mut state = self.state.write();
        state.components.ensure_free(&custom_ids)?;
        for id in custom_ids {
            tracing::debug!(custom_id = %id, "Registered component handler");
            state.components.handlers.insert(id, Arc::clone(&handler));
        }
        Ok(())
    }

    pub fn register_modal(&self, custom_id: impl Into<String>, handler: ModalHandler) -> ClientResult<()> {
        let custom_id = custom_id.into();

        let mut state = self.state.write();
        state.modals.ensure_free(std::slice::from_ref(&custom_id))?;
        tracing::debug!(custom_id = %custom_id, "Registered modal handler");
        state.modals.handlers.insert(custom_id, handler);
        Ok(())
    }

    /// Route component interactions with any of the given custom ids to the returned waiter
    ///
    /// Matches are acknowledged with a deferred update before they reach the waiter.
    pub fn await_component<I, S>(&self, custom_ids: I) -> ClientResult<Waiter<ComponentContext>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.install_waiter(custom_ids.into_iter().map(Into::into).collect(), components)
    }

    pub fn await_modal<I, S>(&self, custom_ids: I) -> ClientResult<Waiter<ModalContext>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.install_waiter(custom_ids.into_iter().map(Into::into).collect(), modals)
    }

    fn install_waiter<H, T>(
        &self,
        custom_ids: Vec<String>,
        space: fn(&mut RegistryState) -> &mut Space<H, T>,
    ) -> ClientResult<Waiter<T>>
    where
        H: Clone + Send + Sync + 'static,
        T: Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(1);

        {
            let mut state = self.state.write();
            let target = space(&mut state);
            target.ensure_free(&custom_ids)?;
            for id in &custom_ids {
                target.waiters.insert(id.clone(), sender.clone());
            }
        }
        tracing::debug!(custom_ids = ?custom_ids, "Waiting for interactions");

        let state = Arc::clone(&self.state);
        let cleanup = Cleanup::new(move || {
            let mut state = state.write();
            let target = space(&mut state);
            for id in &custom_ids {
                if target
                    .waiters
                    .get(id)
                    .is_some_and(|existing| existing.same_channel(&sender))
                {
                    target.waiters.remove(id);
                }
            }
            tracing::debug!(custom_ids = ?custom_ids, "Waiter cleaned up");
        });

        Ok(Waiter::new(receiver, cleanup))
    }

    /// Look up the entry for a dispatched command
    ///
    /// When the first option is a subcommand, `data` is rewritten in place to
    /// the subcommand's view: `name` becomes `parent@child` and `options` the
    /// subcommand's own options. Nothing is rewritten on a miss.
    pub fn resolve_command(&self, data: &mut CommandData) -> Option<CommandEntry> {
        let state = self.state.read();

        let Some(sub) = data.subcommand() else {
            return state.commands.get(&data.name).cloned();
        };

        let key = format!("{}{SUBCOMMAND_SEPARATOR}{}", data.name, sub.name);
        let entry = state.commands.get(&key).cloned()?;
        drop(state);

        let options = std::mem::take(&mut data.options)
            .into_iter()
            .next()
            .map(|sub| sub.options)
            .unwrap_or_default();
        data.name = key;
        data.options = options;
        Some(entry)
    }

    pub(crate) fn component_route(&self, custom_id: &str) -> Route<ComponentHandler, ComponentContext> {
        self.state.read().components.route(custom_id)
    }

    pub(crate) fn modal_route(&self, custom_id: &str) -> Route<ModalHandler, ModalContext> {
        self.state.read().modals.route(custom_id)
    }

    pub fn command(&self, name: &str) -> Option<Command> {
        self.state
            .read()
            .commands
            .get(name)
            .map(|entry| entry.command.clone())
    }

    /// Registry keys of every command, sorted
    pub fn command_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.state.read().commands.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn has_component_handler(&self, custom_id: &str) -> bool {
        self.state.read().components.handlers.contains_key(custom_id)
    }

    pub fn has_component_waiter(&self, custom_id: &str) -> bool {
        self.state.read().components.waiters.contains_key(custom_id)
    }

    pub fn has_modal_handler(&self, custom_id: &str) -> bool {
        self.state.read().modals.handlers.contains_key(custom_id)
    }

    pub fn has_modal_waiter(&self, custom_id: &str) -> bool {
        self.state.read().modals.waiters.contains_key(custom_id)
    }

    /// Rebuild the nested command list the platform expects
    ///
    /// Every `parent@child` entry becomes a subcommand option of its parent.
    /// Roots and subcommands are ordered by name.
    pub fn export_commands(&self, filter: &CommandFilter) -> Vec<Command> {
        let state = self.state.read();

        let mut roots: BTreeMap<&str, Command> = BTreeMap::new();
        let mut children: BTreeMap<&str, BTreeMap<&str, &Command>> = BTreeMap::new();

        for (key, entry) in &state.commands {
            match key.split_once(SUBCOMMAND_SEPARATOR) {
                Some((parent, child)) => {
                    children
                        .entry(parent)
                        .or_default()
                        .insert(child, &entry.command);
                }
                None => {
                    roots.insert(key.as_str(), entry.command.clone());
                }
            }
        }

        roots
            .into_iter()
            .filter(|(name, _)| filter.allows(name))
            .map(|(name, mut command)| {
                for sub in children.get(name).into_iter().flat_map(BTreeMap::values) {
                    let mut option =
                        CommandOption::new(OptionType::SubCommand, sub.name.clone(), sub.description.clone());
                    option.options = sub.options.clone();
                    command.options.push(option);
                }
                command
            })
            .collect()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("HandlerRegistry")
            .field("application_id", &self.application_id)
            .field("commands", &state.commands.len())
            .field("components", &state.components.handlers.len())
            .field("modals", &state.modals.handlers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn noop_command() -> CommandHandler {
        command_handler(|_ctx| async {})
    }

    fn noop_component() -> ComponentHandler {
        component_handler(|_ctx| async {})
    }

    fn noop_modal() -> ModalHandler {
        modal_handler(|_ctx| async {})
    }

    fn entry(name: &str) -> CommandEntry {
        CommandEntry::new(Command::new(name, format!("{name} command")), noop_command())
    }

    fn registry() -> HandlerRegistry {
        HandlerRegistry::new(Snowflake::new(2002))
    }

    #[test]
    fn test_register_fills_defaults() {
        let registry = registry();
        registry.register_command(entry("hello")).unwrap();

        let command = registry.command("hello").unwrap();
        assert_eq!(command.kind, Some(CommandType::ChatInput));
        assert_eq!(command.application_id, Some(Snowflake::new(2002)));
        assert_eq!(command.contexts, Some(vec![InteractionContextType::Guild]));
    }

    #[test]
    fn test_default_contexts_are_configurable() {
        let registry = registry().with_default_contexts(vec![
            InteractionContextType::Guild,
            InteractionContextType::BotDm,
        ]);
        let mut message_command = entry("quote");
        message_command.command = message_command.command.kind(CommandType::Message);
        registry.register_command(message_command).unwrap();

        let command = registry.command("quote").unwrap();
        assert_eq!(command.kind, Some(CommandType::Message));
        assert_eq!(command.contexts.unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_command_is_rejected() {
        let registry = registry();
        registry.register_command(entry("hello")).unwrap();

        let err = registry.register_command(entry("hello")).unwrap_err();
        assert!(matches!(err, ClientError::DuplicateCommand(name) if name == "hello"));
    }

    #[test]
    fn test_subcommand_registration() {
        let registry = registry();

        assert!(matches!(
            registry.register_subcommand(entry("stats"), "runtime"),
            Err(ClientError::UnknownParent(_))
        ));

        registry.register_command(entry("runtime")).unwrap();
        registry.register_subcommand(entry("stats"), "runtime").unwrap();
        assert!(matches!(
            registry.register_subcommand(entry("stats"), "runtime"),
            Err(ClientError::DuplicateSubCommand(key)) if key == "runtime@stats"
        ));

        assert_eq!(registry.command_keys(), vec!["runtime", "runtime@stats"]);
    }

    #[test]
    fn test_resolve_rewrites_subcommand() {
        let registry = registry();
        registry.register_command(entry("runtime")).unwrap();
        registry.register_subcommand(entry("stats"), "runtime").unwrap();

        let mut data: CommandData = serde_json::from_value(json!({
            "name": "runtime",
            "options": [{
                "name": "stats",
                "type": 1,
                "options": [{"name": "verbose", "type": 5, "value": true}]
            }]
        }))
        .unwrap();

        let found = registry.resolve_command(&mut data).unwrap();
        assert_eq!(found.command.name, "stats");
        assert_eq!(data.name, "runtime@stats");
        assert_eq!(data.options.len(), 1);
        assert_eq!(data.options[0].name, "verbose");
    }

    #[test]
    fn test_resolve_miss_leaves_data_untouched() {
        let registry = registry();
        registry.register_command(entry("runtime")).unwrap();

        let mut data: CommandData = serde_json::from_value(json!({
            "name": "runtime",
            "options": [{"name": "gone", "type": 1}]
        }))
        .unwrap();
        let before = data.clone();

        assert!(registry.resolve_command(&mut data).is_none());
        assert_eq!(data, before);

        let mut unknown: CommandData = serde_json::from_value(json!({"name": "nope"})).unwrap();
        assert!(registry.resolve_command(&mut unknown).is_none());
    }

    #[test]
    fn test_component_registration_is_atomic() {
        let registry = registry();
        registry.register_component(["b"], noop_component()).unwrap();

        let err = registry
            .register_component(["a", "b", "c"], noop_component())
            .unwrap_err();
        assert!(matches!(err, ClientError::CustomIdInUse(id) if id == "b"));
        assert!(!registry.has_component_handler("a"));
        assert!(!registry.has_component_handler("c"));
    }

    #[test]
    fn test_static_and_dynamic_spaces_exclude_each_other() {
        let registry = registry();
        registry.register_component(["static"], noop_component()).unwrap();
        registry.register_modal("form", noop_modal()).unwrap();

        assert!(registry.await_component(["static"]).is_err());
        assert!(registry.await_modal(["form"]).is_err());

        let _waiter = registry.await_component(["dynamic"]).unwrap();
        assert!(registry
            .register_component(["dynamic"], noop_component())
            .is_err());
        assert!(registry.await_component(["other", "dynamic"]).is_err());
        assert!(!registry.has_component_waiter("other"));

        // Component and modal ids live in separate namespaces
        registry.register_modal("static", noop_modal()).unwrap();
    }

    #[test]
    fn test_waiter_cleanup_removes_mappings() {
        let registry = registry();
        let mut waiter = registry.await_component(["x", "y"]).unwrap();
        assert!(registry.has_component_waiter("x"));
        assert!(registry.has_component_waiter("y"));

        waiter.cleanup();
        assert!(!registry.has_component_waiter("x"));
        assert!(!registry.has_component_waiter("y"));

        // The ids are free again
        let _again = registry.await_component(["x"]).unwrap();
    }

    #[test]
    fn test_stale_cleanup_keeps_newer_waiter() {
        let registry = registry();
        let first = registry.await_modal(["m"]).unwrap();
        let handle = first.cleanup_handle();
        drop(first);
        assert!(!registry.has_modal_waiter("m"));

        let _second = registry.await_modal(["m"]).unwrap();
        handle.run();
        assert!(registry.has_modal_waiter("m"));
    }

    #[tokio::test]
    async fn test_cleanup_closes_channel() {
        let registry = registry();
        let mut waiter = registry.await_component(["z"]).unwrap();

        waiter.cleanup_handle().run();
        assert!(waiter.recv().await.is_none());
    }

    #[test]
    fn test_export_nests_subcommands() {
        let registry = registry();
        registry.register_command(entry("runtime")).unwrap();
        registry.register_command(entry("hello")).unwrap();
        registry.register_subcommand(entry("uptime"), "runtime").unwrap();
        let mut stats = entry("stats");
        stats.command = stats
            .command
            .option(CommandOption::new(OptionType::Boolean, "verbose", "More output"));
        registry.register_subcommand(stats, "runtime").unwrap();

        let exported = registry.export_commands(&CommandFilter::All);
        let names: Vec<&str> = exported.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["hello", "runtime"]);

        let runtime = &exported[1];
        let subs: Vec<&str> = runtime.options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(subs, vec!["stats", "uptime"]);
        assert!(runtime
            .options
            .iter()
            .all(|o| o.kind == OptionType::SubCommand));
        assert_eq!(runtime.options[0].options[0].name, "verbose");
    }

    #[test]
    fn test_export_filters_roots() {
        let registry = registry();
        for name in ["a", "b", "c"] {
            registry.register_command(entry(name)).unwrap();
        }

        let names = |filter: CommandFilter| -> Vec<String> {
            registry
                .export_commands(&filter)
                .into_iter()
                .map(|c| c.name)
                .collect()
        };

        assert_eq!(names(CommandFilter::Only(vec!["b".to_string()])), vec!["b"]);
        assert_eq!(
            names(CommandFilter::Except(vec!["b".to_string()])),
            vec!["a", "c"]
        );
    }

    #[derive(Debug, Clone)]
    enum Op {
        StaticComponent(Vec<u8>),
        AwaitComponent(Vec<u8>),
        StaticModal(u8),
        AwaitModal(Vec<u8>),
        Cleanup(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        let ids = proptest::collection::vec(0u8..6, 1..4);
        prop_oneof![
            ids.clone().prop_map(Op::StaticComponent),
            ids.clone().prop_map(Op::AwaitComponent),
            (0u8..6).prop_map(Op::StaticModal),
            ids.prop_map(Op::AwaitModal),
            (0usize..8).prop_map(Op::Cleanup),
        ]
    }

    fn names(ids: &[u8]) -> Vec<String> {
        ids.iter().map(|id| format!("id-{id}")).collect()
    }

    /// Occupancy of every id in each of the four spaces
    fn snapshot(registry: &HandlerRegistry) -> Vec<[bool; 4]> {
        names(&[0, 1, 2, 3, 4, 5])
            .iter()
            .map(|id| {
                [
                    registry.has_component_handler(id),
                    registry.has_component_waiter(id),
                    registry.has_modal_handler(id),
                    registry.has_modal_waiter(id),
                ]
            })
            .collect()
    }

    proptest! {
        #[test]
        fn prop_spaces_never_share_an_id(ops in proptest::collection::vec(op(), 1..40)) {
            let registry = registry();
            let mut component_waiters = Vec::new();
            let mut modal_waiters = Vec::new();

            for op in ops {
                let before = snapshot(&registry);
                match op {
                    Op::StaticComponent(ids) => {
                        let ids = names(&ids);
                        let free = ids.iter().all(|id| {
                            !registry.has_component_handler(id) && !registry.has_component_waiter(id)
                        });
                        let installed = registry.register_component(ids, noop_component()).is_ok();
                        prop_assert_eq!(installed, free);
                        if !installed {
                            prop_assert_eq!(snapshot(&registry), before);
                        }
                    }
                    Op::AwaitComponent(ids) => {
                        let ids = names(&ids);
                        let free = ids.iter().all(|id| {
                            !registry.has_component_handler(id) && !registry.has_component_waiter(id)
                        });
                        let result = registry.await_component(ids);
                        prop_assert_eq!(result.is_ok(), free);
                        match result {
                            Ok(waiter) => component_waiters.push(waiter),
                            Err(_) => {
                                prop_assert_eq!(snapshot(&registry), before);
                            }
                        }
                    }
                    Op::StaticModal(id) => {
                        let id = format!("id-{id}");
                        let free = !registry.has_modal_handler(&id) && !registry.has_modal_waiter(&id);
                        let installed = registry.register_modal(id, noop_modal()).is_ok();
                        prop_assert_eq!(installed, free);
                        if !installed {
                            prop_assert_eq!(snapshot(&registry), before);
                        }
                    }
                    Op::AwaitModal(ids) => {
                        let ids = names(&ids);
                        let free = ids.iter().all(|id| {
                            !registry.has_modal_handler(id) && !registry.has_modal_waiter(id)
                        });
                        let result = registry.await_modal(ids);
                        prop_assert_eq!(result.is_ok(), free);
                        match result {
                            Ok(waiter) => modal_waiters.push(waiter),
                            Err(_) => {
                                prop_assert_eq!(snapshot(&registry), before);
                            }
                        }
                    }
                    Op::Cleanup(index) => {
                        if !component_waiters.is_empty() {
                            let waiter = component_waiters.remove(index % component_waiters.len());
                            let handle = waiter.cleanup_handle();
                            drop(waiter);
                            handle.run();
                        }
                        if !modal_waiters.is_empty() {
                            modal_waiters.remove(index % modal_waiters.len());
                        }
                    }
                }

                for id in names(&[0, 1, 2, 3, 4, 5]) {
                    let shared_component = registry.has_component_handler(&id) && registry.has_component_waiter(&id);
                    let shared_modal = registry.has_modal_handler(&id) && registry.has_modal_waiter(&id);
                    prop_assert!(!shared_component);
                    prop_assert!(!shared_modal);
                }
            }
        }

        #[test]
        fn prop_cleanup_is_single_fire(runs in 1usize..5) {
            let registry = registry();
            let waiter = registry.await_component(["a", "b"]).unwrap();
            let handle = waiter.cleanup_handle();
            drop(waiter);

            let replacement = registry.await_component(["a"]).unwrap();
            for _ in 0..runs {
                handle.run();
            }

            prop_assert!(registry.has_component_waiter("a"));
            prop_assert!(!registry.has_component_waiter("b"));
            drop(replacement);
            prop_assert!(!registry.has_component_waiter("a"));
        }
    }
}
