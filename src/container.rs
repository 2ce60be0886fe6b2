use crate::{
    CompilerPass, Definition, Dependency, DirectiveKind, DynSvc, InjectError,
    InjectResult, Injectable, Injected, Interface, Module, ParameterBag,
    ServiceInfo, Svc,
};
use std::{
    collections::{hash_map::Entry, HashMap},
    mem,
};
use tracing::{debug, trace, warn};

/// The lifecycle of a [`Container`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum ContainerState {
    /// Parameters, services and passes can be registered.
    Registering,

    /// Services are being wired.
    Resolving,

    /// Every service is wired and compiler passes are running. Lookups are
    /// allowed.
    Processing,

    /// Compilation finished. The container is read-only.
    Compiled,

    /// Compilation failed. The container can't be used anymore.
    Failed,
}

/// A dependency injection container. It holds the registered parameters,
/// service definitions and compiler passes, and after compilation the wired
/// instance of every service.
///
/// Services are registered as plain values with [`Container::add`]. Each
/// service type declares, through [`Injectable`], which of its fields receive
/// other services or parameters. [`Container::compile`] wires every service
/// exactly once, runs the compiler passes and freezes the container, after
/// which services can be requested with [`Container::get`] and
/// [`Container::get_tagged`].
///
/// ## Example
///
/// ```
/// use field_injector::{injectable, Container, Svc};
///
/// #[derive(Default)]
/// struct Credentials {
///     username: String,
///     password: String,
/// }
///
/// #[derive(Default)]
/// struct Session {
///     credentials: Option<Svc<Credentials>>,
/// }
///
/// injectable! {
///     Credentials {
///         username: parameter("username"),
///         password: parameter("password"),
///     }
/// }
///
/// injectable! {
///     Session {
///         credentials: service("app.credentials"),
///     }
/// }
///
/// let mut container = Container::new();
/// container.add_parameter("username", "JohnDoe").unwrap();
/// container.add_parameter("password", "123").unwrap();
/// container.add("app.session", Session::default()).unwrap();
/// container.add("app.credentials", Credentials::default()).unwrap();
/// container.compile().unwrap();
///
/// let session: Svc<Session> = container.get("app.session").unwrap();
/// let credentials: Svc<Credentials> = container.get("app.credentials").unwrap();
/// assert!(Svc::ptr_eq(session.credentials.as_ref().unwrap(), &credentials));
/// assert_eq!("JohnDoe", credentials.username);
///
/// // The container is frozen once compiled.
/// assert!(container.add_parameter("username", "JaneDoe").is_err());
/// ```
pub struct Container {
    parameters: ParameterBag,
    definitions: HashMap<String, Definition>,
    order: Vec<String>,
    instances: HashMap<String, DynSvc>,
    tags: HashMap<String, Vec<String>>,
    passes: Vec<Box<dyn CompilerPass>>,
    building: Vec<String>,
    state: ContainerState,
}

impl Container {
    /// Creates an empty, uncompiled container.
    #[must_use]
    pub fn new() -> Self {
        Container {
            parameters: ParameterBag::new(),
            definitions: HashMap::new(),
            order: Vec::new(),
            instances: HashMap::new(),
            tags: HashMap::new(),
            passes: Vec::new(),
            building: Vec::new(),
            state: ContainerState::Registering,
        }
    }

    /// Sets a parameter. Values of the form `env(KEY)` are replaced by the
    /// environment variable `KEY` right away. See [`ParameterBag`].
    pub fn add_parameter(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> InjectResult<()> {
        self.ensure_registering("add a parameter")?;
        drop(self.parameters.set(name, value));
        Ok(())
    }

    /// Registers `service` as `id` and returns its definition so tags can be
    /// attached. Registering another service with the same id replaces the
    /// previous definition.
    pub fn add<T: Injectable>(
        &mut self,
        id: impl Into<String>,
        service: T,
    ) -> InjectResult<&mut Definition> {
        self.ensure_registering("add a service")?;
        Ok(self.insert_definition(Definition::new(id, service)))
    }

    /// Registers a compiler pass. Passes run in registration order once every
    /// service has been wired.
    pub fn add_compiler_pass<P: CompilerPass>(
        &mut self,
        pass: P,
    ) -> InjectResult<()> {
        self.ensure_registering("add a compiler pass")?;
        self.passes.push(Box::new(pass));
        Ok(())
    }

    /// Adds every parameter, service and compiler pass of a module. Module
    /// parameters and services replace any already registered under the same
    /// name, and module passes run after those already registered.
    pub fn add_module(&mut self, module: Module) -> InjectResult<()> {
        self.ensure_registering("add a module")?;
        debug!(
            parameters = module.parameters.len(),
            services = module.definitions.len(),
            passes = module.passes.len(),
            "adding module"
        );

        self.parameters.merge(module.parameters);
        for definition in module.definitions {
            self.insert_definition(definition);
        }
        self.passes.extend(module.passes);
        Ok(())
    }

    /// Wires every registered service, runs the compiler passes and freezes
    /// the container.
    ///
    /// Services are built in registration order. A service directive builds
    /// its target first if it hasn't been built yet, so the order services are
    /// registered in doesn't matter. Each service is tagged as it's built.
    ///
    /// Compilation stops at the first error. The container can't be used
    /// after a failed compilation, and it can only be compiled once.
    ///
    /// ```
    /// use field_injector::{injectable, Container, InjectError, Svc};
    ///
    /// #[derive(Default)]
    /// struct Foo {
    ///     bar: Option<Svc<Bar>>,
    /// }
    ///
    /// #[derive(Default)]
    /// struct Bar {
    ///     foo: Option<Svc<Foo>>,
    /// }
    ///
    /// injectable!(Foo { bar: service("bar") });
    /// injectable!(Bar { foo: service("foo") });
    ///
    /// let mut container = Container::new();
    /// container.add("foo", Foo::default()).unwrap();
    /// container.add("bar", Bar::default()).unwrap();
    ///
    /// match container.compile() {
    ///     Err(InjectError::CycleDetected { cycle, .. }) => {
    ///         assert_eq!(vec!["foo", "bar", "foo"], cycle);
    ///     }
    ///     _ => panic!("a cycle was not detected"),
    /// }
    /// ```
    pub fn compile(&mut self) -> InjectResult<()> {
        self.ensure_registering("compile")?;
        debug!(
            services = self.order.len(),
            parameters = self.parameters.len(),
            passes = self.passes.len(),
            "compiling container"
        );

        match self.compile_services() {
            Ok(()) => {
                self.state = ContainerState::Compiled;
                debug!(services = self.instances.len(), "container compiled");
                Ok(())
            }
            Err(error) => {
                self.state = ContainerState::Failed;
                debug!(%error, "container failed to compile");
                Err(error)
            }
        }
    }

    /// Gets the service registered as `id`. The service can be requested as
    /// its concrete type, as an [`Interface`] it implements, or as
    /// `dyn Service`.
    pub fn get<I: ?Sized + Interface>(&self, id: &str) -> InjectResult<Svc<I>> {
        let service = self.get_dyn(id)?;
        I::downcast(service).map_err(|_| InjectError::InvalidServiceType {
            id: id.to_owned(),
            expected: ServiceInfo::of::<I>(),
        })
    }

    /// Returns whether a service has been resolved for `id`. This is always
    /// `false` before compilation or after a failed one.
    #[must_use]
    pub fn has(&self, id: &str) -> bool {
        self.ensure_resolved().is_ok() && self.instances.contains_key(id)
    }

    /// Gets every service tagged `tag`, in the order they were tagged. If the
    /// tag was never used, returns `Ok(None)`.
    pub fn get_tagged<I: ?Sized + Interface>(
        &self,
        tag: &str,
    ) -> InjectResult<Option<Vec<Svc<I>>>> {
        self.ensure_resolved()?;
        let ids = match self.tags.get(tag) {
            Some(ids) => ids,
            None => return Ok(None),
        };

        ids.iter()
            .map(|id| self.get::<I>(id))
            .collect::<InjectResult<Vec<_>>>()
            .map(Some)
    }

    /// Gets the ids of the services tagged `tag`, in the order they were
    /// tagged. Tags are only recorded during compilation.
    #[must_use]
    pub fn tagged_ids(&self, tag: &str) -> Option<&[String]> {
        self.tags.get(tag).map(Vec::as_slice)
    }

    /// Iterates over every tag that has been recorded, in no particular
    /// order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    /// Iterates over the ids of every registered service, in registration
    /// order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Gets the definition registered as `id`.
    #[must_use]
    pub fn definition(&self, id: &str) -> Option<&Definition> {
        self.definitions.get(id)
    }

    /// Gets the parameters of this container.
    #[must_use]
    pub fn parameters(&self) -> &ParameterBag {
        &self.parameters
    }

    /// Gets the current lifecycle state of this container.
    #[must_use]
    pub fn state(&self) -> ContainerState {
        self.state
    }

    /// Returns whether compilation finished successfully.
    #[must_use]
    pub fn is_compiled(&self) -> bool {
        self.state == ContainerState::Compiled
    }

    fn get_dyn(&self, id: &str) -> InjectResult<DynSvc> {
        self.ensure_resolved()?;
        self.instances
            .get(id)
            .cloned()
            .ok_or_else(|| InjectError::MissingService { id: id.to_owned() })
    }

    fn ensure_registering(&self, operation: &'static str) -> InjectResult<()> {
        match self.state {
            ContainerState::Registering => Ok(()),
            ContainerState::Failed => Err(InjectError::CompilationFailed),
            _ => Err(InjectError::Frozen { operation }),
        }
    }

    fn ensure_resolved(&self) -> InjectResult<()> {
        match self.state {
            ContainerState::Processing | ContainerState::Compiled => Ok(()),
            ContainerState::Failed => Err(InjectError::CompilationFailed),
            ContainerState::Registering | ContainerState::Resolving => {
                Err(InjectError::NotCompiled)
            }
        }
    }

    fn insert_definition(&mut self, definition: Definition) -> &mut Definition {
        debug!(
            id = definition.id(),
            service = definition.service_info().name(),
            "service registered"
        );

        match self.definitions.entry(definition.id().to_owned()) {
            Entry::Occupied(mut entry) => {
                warn!(
                    id = %entry.key(),
                    replaced = entry.get().service_info().name(),
                    "service definition replaced"
                );
                entry.insert(definition);
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                self.order.push(entry.key().clone());
                entry.insert(definition)
            }
        }
    }

    fn compile_services(&mut self) -> InjectResult<()> {
        self.state = ContainerState::Resolving;
        for id in self.order.clone() {
            self.build(&id, None)?;
        }

        self.state = ContainerState::Processing;
        let passes = mem::take(&mut self.passes);
        for (index, pass) in passes.into_iter().enumerate() {
            trace!(index, "running compiler pass");
            pass.process(self)?;
        }

        Ok(())
    }

    /// Gets the wired instance of `id`, building it first if needed.
    fn build(
        &mut self,
        id: &str,
        required_by: Option<&str>,
    ) -> InjectResult<DynSvc> {
        if let Some(service) = self.instances.get(id) {
            return Ok(service.clone());
        }

        let definition = self.definitions.get_mut(id).ok_or_else(|| {
            InjectError::MissingDefinition {
                id: id.to_owned(),
                required_by: required_by.map(ToOwned::to_owned),
            }
        })?;
        let service_info = definition.service_info();

        // A definition without its instance is already being built further
        // up the stack
        let unwired = match definition.take_service() {
            Some(unwired) => unwired,
            None => return Err(self.cycle_error(id, service_info)),
        };

        for tag in definition.tags() {
            self.tags.entry(tag.clone()).or_default().push(id.to_owned());
        }

        trace!(id, service = service_info.name(), "building service");
        self.building.push(id.to_owned());
        let service = unwired.wire(&mut |dependency| {
            self.resolve(id, service_info, dependency)
        });
        self.building.pop();
        let service = service?;

        self.instances.insert(id.to_owned(), service.clone());
        Ok(service)
    }

    fn resolve(
        &mut self,
        id: &str,
        service_info: ServiceInfo,
        dependency: &Dependency,
    ) -> InjectResult<Injected> {
        let target = dependency.target();
        if target.is_empty() {
            return Err(InjectError::EmptyDirective {
                service_info,
                field: dependency.field(),
                kind: dependency.kind(),
            });
        }

        trace!(
            id,
            field = dependency.field(),
            kind = %dependency.kind(),
            target,
            "resolving dependency"
        );
        match dependency.kind() {
            DirectiveKind::Service => {
                self.build(target, Some(id)).map(Injected::Service)
            }
            DirectiveKind::Parameter => self
                .parameters
                .get(target)
                .map(|value| Injected::Parameter(value.to_owned()))
                .ok_or_else(|| InjectError::MissingParameter {
                    name: target.to_owned(),
                    service_info,
                    field: dependency.field(),
                }),
        }
    }

    fn cycle_error(&self, id: &str, service_info: ServiceInfo) -> InjectError {
        let mut cycle = self.building.clone();
        cycle.push(id.to_owned());

        InjectError::CycleDetected {
            service_info,
            cycle,
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        Container::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::injectable;

    #[derive(Default)]
    struct Leaf;

    #[derive(Default)]
    struct Branch {
        leaf: Option<Svc<Leaf>>,
    }

    injectable!(Leaf {});
    injectable!(Branch { leaf: service("leaf") });

    #[test]
    fn registration_order_does_not_matter() {
        let mut container = Container::new();
        container.add("branch", Branch::default()).unwrap();
        container.add("leaf", Leaf).unwrap();
        container.compile().unwrap();

        let branch: Svc<Branch> = container.get("branch").unwrap();
        let leaf: Svc<Leaf> = container.get("leaf").unwrap();
        assert!(Svc::ptr_eq(branch.leaf.as_ref().unwrap(), &leaf));
    }

    #[test]
    fn state_moves_through_lifecycle() {
        let mut container = Container::new();
        assert_eq!(ContainerState::Registering, container.state());

        container
            .add_compiler_pass(|container: &Container| -> InjectResult<()> {
                assert_eq!(ContainerState::Processing, container.state());
                Ok(())
            })
            .unwrap();
        container.compile().unwrap();

        assert_eq!(ContainerState::Compiled, container.state());
        assert!(container.is_compiled());
    }

    #[test]
    fn failed_compile_poisons_container() {
        let mut container = Container::new();
        container.add("branch", Branch::default()).unwrap();

        match container.compile() {
            Err(InjectError::MissingDefinition { id, required_by }) => {
                assert_eq!("leaf", id);
                assert_eq!(Some("branch"), required_by.as_deref());
            }
            Err(error) => Err(error).unwrap(),
            Ok(()) => panic!("compiled without the leaf service"),
        }

        assert_eq!(ContainerState::Failed, container.state());
        assert!(container.building.is_empty());
        assert!(matches!(
            container.get::<Branch>("branch"),
            Err(InjectError::CompilationFailed)
        ));
        assert!(matches!(
            container.add("leaf", Leaf),
            Err(InjectError::CompilationFailed)
        ));
    }

    #[test]
    fn replaced_definition_keeps_first_position() {
        let mut container = Container::new();
        container.add("a", Leaf).unwrap();
        container.add("b", Leaf).unwrap();
        container.add("a", Branch::default()).unwrap().tag("replaced");
        container.add("leaf", Leaf).unwrap();

        let ids: Vec<_> = container.ids().collect();
        assert_eq!(vec!["a", "b", "leaf"], ids);
        assert_eq!(
            ServiceInfo::of::<Branch>(),
            container.definition("a").unwrap().service_info()
        );

        container.compile().unwrap();
        assert!(container.get::<Branch>("a").is_ok());
        assert_eq!(Some(&["a".to_owned()][..]), container.tagged_ids("replaced"));
    }

    #[test]
    fn definitions_are_consumed_by_compile() {
        let mut container = Container::new();
        container.add("leaf", Leaf).unwrap().tag("leaves");
        assert!(!container.definition("leaf").unwrap().is_consumed());
        assert_eq!(None, container.tagged_ids("leaves"));

        container.compile().unwrap();
        let definition = container.definition("leaf").unwrap();
        assert!(definition.is_consumed());
        assert_eq!(&["leaves"], definition.tags());
        assert_eq!(vec!["leaves"], container.tags().collect::<Vec<_>>());
    }
}
