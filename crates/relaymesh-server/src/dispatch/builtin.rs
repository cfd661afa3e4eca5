//! Commands every non-router process understands.

use crate::dispatch::CommandRegistry;
use crate::message::{
    Empty, ServiceName, FUNC_CLOSE, FUNC_REGISTER_SERVICE_IN_GATEWAY,
    FUNC_REMOVE_SERVICE_IN_GATEWAY,
};

/// Service directory sync pushed by the router.
pub fn register_service_directory<S: 'static>(commands: &CommandRegistry<S>) {
    let services = commands.services_handle();
    commands.register(FUNC_REGISTER_SERVICE_IN_GATEWAY, move |_: &mut S, _, args: ServiceName| {
        tracing::info!(service = %args.name, "service registered");
        services.mark_active(&args.name);
    });

    let services = commands.services_handle();
    commands.register(FUNC_REMOVE_SERVICE_IN_GATEWAY, move |_: &mut S, _, args: ServiceName| {
        tracing::info!(service = %args.name, "service removed");
        services.mark_inactive(&args.name);
    });
}

/// `FUNC_Close` tears the context connection down.
pub fn register_close<S: 'static>(commands: &CommandRegistry<S>) {
    commands.register(FUNC_CLOSE, |_: &mut S, ctx, _: Empty| {
        ctx.close();
    });
}
