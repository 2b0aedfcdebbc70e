//! Small macros shared by the HTTP apps.

#[cfg(feature = "actix")]
#[doc(hidden)]
pub use actix_web as __actix_web;

/// Generate a `pub fn routes(cfg: &mut ServiceConfig)` for a route module
///
/// `route name` registers an attribute-routed handler (`#[get(..)]` etc.),
/// `load module` pulls in the `routes` function of a child module.
///
/// ```ignore
/// macros_utils::routes! {
///     load health,
///     route list_targets,
/// }
/// ```
#[cfg(feature = "actix")]
#[macro_export]
macro_rules! routes {
    (@register $cfg:ident, route $handler:ident) => {
        $cfg.service($handler);
    };
    (@register $cfg:ident, load $module:ident) => {
        $cfg.configure($module::routes);
    };
    ($($kind:ident $item:ident),* $(,)?) => {
        pub fn routes(cfg: &mut $crate::__actix_web::web::ServiceConfig) {
            $( $crate::routes!(@register cfg, $kind $item); )*
        }
    };
}
