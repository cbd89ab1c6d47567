//! # Hook Dispatch
//!
//! Maps host hook names to typed event decoders.
//!
//! Each registration names the argument type the hook delivers and a
//! function turning those arguments into a [`HostEvent`]. Decoding is the
//! only place hook payloads are validated.

use recorder_core::{
    HostEvent, Mutation, OptionWrite, PluginActivation, PostDelete, PostFields, PostId, PostSave,
    PostSnapshot, RecorderError, TermSave, ThemeSwitch, UserMetaUpdate,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

type Decoder = Box<dyn Fn(Value) -> Result<HostEvent, serde_json::Error> + Send + Sync>;

/// Arguments of `pre_post_update`: the post as currently stored.
#[derive(Debug, Clone, Deserialize)]
pub struct PostUpdating {
    pub post_id: PostId,
    pub post: PostFields,
}

/// Registry of the hooks the recorder subscribes to.
pub struct HookDispatcher {
    hooks: BTreeMap<&'static str, Decoder>,
}

impl std::fmt::Debug for HookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookDispatcher")
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for HookDispatcher {
    /// All host hooks the recorder understands.
    fn default() -> Self {
        let mut dispatcher = Self::empty();
        dispatcher
            .register("activate_plugin", |a: PluginActivation| {
                Mutation::PluginActivated(a).into()
            })
            .register("switch_theme", |a: ThemeSwitch| Mutation::ThemeSwitched(a).into())
            .register("added_option", option_written)
            .register("updated_option", option_written)
            .register("add_site_option", option_written)
            .register("update_site_option", option_written)
            .register("saved_term", |a: TermSave| Mutation::TermSaved(a).into())
            .register("pre_post_update", |a: PostUpdating| {
                HostEvent::PostUpdating(PostSnapshot {
                    post_id: a.post_id,
                    fields: a.post,
                })
            })
            .register("save_post", |a: PostSave| Mutation::PostSaved(a).into())
            .register("delete_post", |a: PostDelete| Mutation::PostDeleted(a).into())
            .register("added_user_meta", user_meta_updated)
            .register("updated_user_meta", user_meta_updated);
        dispatcher
    }
}

fn option_written(args: OptionWrite) -> HostEvent {
    Mutation::OptionWritten(args).into()
}

fn user_meta_updated(args: UserMetaUpdate) -> HostEvent {
    Mutation::UserMetaUpdated(args).into()
}

impl HookDispatcher {
    /// A dispatcher with the standard host hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher with no hooks.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            hooks: BTreeMap::new(),
        }
    }

    /// Register `hook`, decoding its arguments as `A`.
    pub fn register<A>(&mut self, hook: &'static str, build: fn(A) -> HostEvent) -> &mut Self
    where
        A: DeserializeOwned + 'static,
    {
        let decoder: Decoder = Box::new(move |args| serde_json::from_value::<A>(args).map(build));
        self.hooks.insert(hook, decoder);
        self
    }

    /// Decode the arguments of one hook invocation.
    pub fn decode(&self, hook: &str, args: Value) -> Result<HostEvent, RecorderError> {
        let decoder = self
            .hooks
            .get(hook)
            .ok_or_else(|| RecorderError::UnknownHook(hook.to_string()))?;
        decoder(args).map_err(|e| RecorderError::InvalidEvent {
            hook: hook.to_string(),
            reason: e.to_string(),
        })
    }

    #[must_use]
    pub fn is_registered(&self, hook: &str) -> bool {
        self.hooks.contains_key(hook)
    }

    /// Registered hook names, sorted.
    pub fn hooks(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.hooks.keys().copied()
    }
}
