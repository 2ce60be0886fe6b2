use crate::{Container, InjectResult, Interface, Svc};
use std::marker::PhantomData;
use tracing::trace;

/// Wiring that runs once, after every declared dependency has been resolved
/// and before the container is frozen.
///
/// Passes run in the order they were registered and can freely look up
/// services, including tagged groups. Their usual job is wiring that can't be
/// declared per field, such as handing every service with some tag to a
/// registry service.
///
/// This is implemented for every `FnOnce(&Container) -> InjectResult<()>`.
pub trait CompilerPass: 'static {
    /// Runs the pass against the resolved container.
    fn process(self: Box<Self>, container: &Container) -> InjectResult<()>;
}

impl<F> CompilerPass for F
where
    F: 'static + FnOnce(&Container) -> InjectResult<()>,
{
    fn process(self: Box<Self>, container: &Container) -> InjectResult<()> {
        (*self)(container)
    }
}

/// A compiler pass that hands every service with a tag to a target service.
/// See [`collect_tagged`].
pub struct CollectTagged<I, T, F>
where
    I: ?Sized + Interface,
    T: ?Sized + Interface,
    F: 'static + Fn(&T, Svc<I>),
{
    tag: String,
    target: String,
    apply: F,
    marker: PhantomData<fn(Svc<I>, Svc<T>)>,
}

impl<I, T, F> CompilerPass for CollectTagged<I, T, F>
where
    I: ?Sized + Interface,
    T: ?Sized + Interface,
    F: 'static + Fn(&T, Svc<I>),
{
    fn process(self: Box<Self>, container: &Container) -> InjectResult<()> {
        let target: Svc<T> = container.get(&self.target)?;
        let services = container.get_tagged::<I>(&self.tag)?.unwrap_or_default();
        trace!(
            tag = %self.tag,
            target = %self.target,
            count = services.len(),
            "collecting tagged services"
        );

        for service in services {
            (self.apply)(&target, service);
        }

        Ok(())
    }
}

/// Creates a compiler pass that requests every service tagged `tag` as
/// `Svc<I>` and passes each of them, in tag order, to `apply` along with the
/// service registered as `target`. A tag that was never used hands over
/// nothing.
///
/// Since the target is already shared when passes run, it needs interior
/// mutability to accumulate what it's given.
///
/// ## Example
///
/// ```
/// use field_injector::{collect_tagged, injectable, interface, Container, Svc};
/// use std::sync::Mutex;
///
/// trait Command: Send + Sync {
///     fn name(&self) -> &'static str;
/// }
///
/// struct Build;
/// impl Command for Build {
///     fn name(&self) -> &'static str { "build" }
/// }
///
/// struct Clean;
/// impl Command for Clean {
///     fn name(&self) -> &'static str { "clean" }
/// }
///
/// interface!(Command = [Build, Clean]);
///
/// #[derive(Default)]
/// struct Registry {
///     commands: Mutex<Vec<Svc<dyn Command>>>,
/// }
///
/// injectable!(Build {});
/// injectable!(Clean {});
/// injectable!(Registry {});
///
/// let mut container = Container::new();
/// container.add("registry", Registry::default()).unwrap();
/// container.add("build", Build).unwrap().tag("command");
/// container.add("clean", Clean).unwrap().tag("command");
/// container
///     .add_compiler_pass(collect_tagged(
///         "command",
///         "registry",
///         |registry: &Registry, command: Svc<dyn Command>| {
///             registry.commands.lock().unwrap().push(command);
///         },
///     ))
///     .unwrap();
/// container.compile().unwrap();
///
/// let registry: Svc<Registry> = container.get("registry").unwrap();
/// let names: Vec<_> = registry
///     .commands
///     .lock()
///     .unwrap()
///     .iter()
///     .map(|command| command.name())
///     .collect();
/// assert_eq!(vec!["build", "clean"], names);
/// ```
pub fn collect_tagged<I, T, F>(
    tag: impl Into<String>,
    target: impl Into<String>,
    apply: F,
) -> CollectTagged<I, T, F>
where
    I: ?Sized + Interface,
    T: ?Sized + Interface,
    F: 'static + Fn(&T, Svc<I>),
{
    CollectTagged {
        tag: tag.into(),
        target: target.into(),
        apply,
        marker: PhantomData,
    }
}
