use std::pin::Pin;
use std::sync::Arc;

use futures::Future;

use crate::commands::request::SlashRequest;
use crate::commands::CommandResult;
use crate::Context;


/// Non-generic return type for async command functions.
pub type CallFuture = Pin<Box<dyn Future<Output = CommandResult> + Send>>;

/// Trait for functions that can be called with a request.
pub trait Callable<R>: Send + Sync {
    fn call(&self, ctx: Context, req: R) -> CallFuture;
}

impl<F, Fut> Callable<SlashRequest> for F
where
    F: Fn(Context, SlashRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CommandResult> + Send + 'static,
{
    fn call(&self, ctx: Context, req: SlashRequest) -> CallFuture {
        Box::pin((self)(ctx, req))
    }
}

/// Shared subcommand handler.
pub type SlashFunction = Arc<dyn Callable<SlashRequest>>;
