//! Compile-once dependency injection.
//!
//! A [`Container`] is given named parameters and named service instances.
//! Each service type declares which of its fields should receive another
//! service or a parameter. Compiling the container wires every service
//! exactly once, runs any registered compiler passes and freezes the
//! container, leaving a fully wired object graph that can be queried by id
//! or by tag.
//!
//! By default, services are held in `Arc<T>` and must be `Send + Sync`. This
//! can be changed to `Rc<T>` by disabling default features and enabling the
//! "rc" feature:
//!
//! ```text
//! field_injector = {
//!     version = "*",
//!     default_features = false,
//!     features = ["rc"]
//! }
//! ```
//!
//! # Directives
//!
//! The container never constructs services. It is handed instances and
//! injects into their fields, driven by the directives each type declares
//! through [`Injectable`]:
//!
//! - a **service** directive names the id of another service, which is
//!   injected as a shared pointer to the one instance registered under that
//!   id;
//! - a **parameter** directive names a parameter, whose string value is
//!   injected.
//!
//! Directives are usually declared with the [`injectable!`] macro.
//!
//! # Parameters
//!
//! Parameters are plain strings. A value written as `env(KEY)` is replaced,
//! when it is set, by the value of the environment variable `KEY`. See
//! [`ParameterBag`].
//!
//! # Tags and compiler passes
//!
//! Definitions can be tagged to group services by capability. Once every
//! service is wired, compiler passes run in registration order and can look
//! up services and tag groups to do wiring that can't be expressed per
//! field, such as handing every "command" to a command registry (see
//! [`collect_tagged`]).
//!
//! # Example
//!
//! ```
//! use field_injector::{
//!     collect_tagged, injectable, interface, Container, InjectResult, Svc,
//! };
//! use std::sync::Mutex;
//!
//! // Handlers are registered under a tag and collected by the router.
//! trait Handler: Send + Sync {
//!     fn path(&self) -> String;
//! }
//!
//! #[derive(Default)]
//! struct UserHandler {
//!     prefix: String,
//! }
//!
//! impl Handler for UserHandler {
//!     fn path(&self) -> String {
//!         format!("{}/users", self.prefix)
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Router {
//!     routes: Mutex<Vec<String>>,
//! }
//!
//! #[derive(Default)]
//! struct Server {
//!     router: Option<Svc<Router>>,
//!     address: String,
//! }
//!
//! interface!(Handler = [UserHandler]);
//! injectable!(UserHandler { prefix: parameter("api.prefix") });
//! injectable!(Router {});
//! injectable! {
//!     Server {
//!         router: service("app.router"),
//!         address: parameter("server.address"),
//!     }
//! }
//!
//! fn main() -> InjectResult<()> {
//!     let mut container = Container::new();
//!     container.add_parameter("api.prefix", "/api")?;
//!     container.add_parameter("server.address", "127.0.0.1:8080")?;
//!
//!     container.add("app.server", Server::default())?;
//!     container.add("app.router", Router::default())?;
//!     container.add("app.users", UserHandler::default())?.tag("handler");
//!
//!     container.add_compiler_pass(collect_tagged(
//!         "handler",
//!         "app.router",
//!         |router: &Router, handler: Svc<dyn Handler>| {
//!             router.routes.lock().unwrap().push(handler.path());
//!         },
//!     ))?;
//!
//!     container.compile()?;
//!
//!     let server: Svc<Server> = container.get("app.server")?;
//!     let router = server.router.as_ref().unwrap();
//!     assert_eq!("127.0.0.1:8080", server.address);
//!     assert_eq!(vec!["/api/users"], *router.routes.lock().unwrap());
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic)]
#![warn(missing_docs)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::needless_doctest_main
)]

#[cfg(not(any(feature = "arc", feature = "rc")))]
compile_error!(
    "Either the 'arc' or 'rc' feature must be enabled (but not both)."
);

#[cfg(all(feature = "arc", feature = "rc"))]
compile_error!(
    "The 'arc' and 'rc' features are mutually exclusive and cannot be enabled together."
);

mod container;
mod definition;
mod module;
mod parameters;
mod pass;
mod services;

pub use container::*;
pub use definition::*;
pub use module::*;
pub use parameters::*;
pub use pass::*;
pub use services::*;
