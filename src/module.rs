use crate::{CompilerPass, Definition, Injectable, ParameterBag};

/// A collection of parameters, services and compiler passes that can be
/// added all at once to a [`Container`](crate::Container). Modules can be
/// used to group together related services and configure the container in
/// pieces rather than all at once.
///
/// For creating a module easily via a domain specific language, see
/// [`define_module!`].
#[derive(Default)]
pub struct Module {
    pub(crate) parameters: ParameterBag,
    pub(crate) definitions: Vec<Definition>,
    pub(crate) passes: Vec<Box<dyn CompilerPass>>,
}

impl Module {
    /// Creates an empty module.
    #[must_use]
    pub fn new() -> Self {
        Module::default()
    }

    /// Sets a parameter. Values of the form `env(KEY)` are resolved right
    /// away, exactly as they are by a container.
    pub fn add_parameter(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        drop(self.parameters.set(name, value));
        self
    }

    /// Registers a service and returns its definition so tags can be
    /// attached.
    pub fn add<T: Injectable>(
        &mut self,
        id: impl Into<String>,
        service: T,
    ) -> &mut Definition {
        let index = self.definitions.len();
        self.definitions.push(Definition::new(id, service));
        &mut self.definitions[index]
    }

    /// Registers a compiler pass.
    pub fn add_compiler_pass<P: CompilerPass>(&mut self, pass: P) -> &mut Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Gets the parameters set in this module.
    #[must_use]
    pub fn parameters(&self) -> &ParameterBag {
        &self.parameters
    }

    /// Gets the definitions registered in this module, in registration
    /// order.
    #[must_use]
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }
}

/// Defines a new module using a domain specific language.
///
/// ## Example
///
/// ```
/// use field_injector::{
///     define_module, injectable, Container, InjectResult, Service, Svc,
/// };
///
/// #[derive(Default)]
/// struct Mailer {
///     host: String,
/// }
/// struct Newsletter;
/// #[cfg(test)]
/// struct MockMailer;
///
/// injectable!(Mailer { host: parameter("mailer.host") });
/// injectable!(Newsletter {});
/// # #[cfg(test)]
/// # injectable!(MockMailer {});
///
/// let module = define_module! {
///     parameters = {
///         "mailer.host" => "smtp.local",
///     },
///     services = {
///         "mailer" => Mailer::default() => ["transport"],
///         "newsletter" => Newsletter,
///     },
///     passes = [
///         |container: &Container| -> InjectResult<()> {
///             assert!(container.has("mailer"));
///             Ok(())
///         },
///     ],
///
///     // If a section appears more than once, its entries are all added.
///     // This means we can have services registered only in certain
///     // environments.
///     #[cfg(test)]
///     services = {
///         "mock.mailer" => MockMailer => ["transport"],
///     },
/// };
///
/// let mut container = Container::new();
/// container.add_module(module).unwrap();
/// container.compile().unwrap();
///
/// let mailer: Svc<Mailer> = container.get("mailer").unwrap();
/// assert_eq!("smtp.local", mailer.host);
///
/// let transports = container.get_tagged::<dyn Service>("transport").unwrap();
/// #[cfg(not(test))]
/// assert_eq!(1, transports.unwrap().len());
/// #[cfg(test)]
/// assert_eq!(2, transports.unwrap().len());
/// ```
#[macro_export]
macro_rules! define_module {
    (
        @add $module:expr,
        parameters = {
            $($name:expr => $value:expr),*
            $(,)?
        }
    ) => {
        $($module.add_parameter($name, $value);)*
    };
    (
        @add $module:expr,
        services = {
            $($id:expr => $service:expr $(=> [$($tag:expr),* $(,)?])?),*
            $(,)?
        }
    ) => {
        $(
            #[allow(unused_variables)]
            let definition = $module.add($id, $service);
            $($(definition.tag($tag);)*)?
        )*
    };
    (
        @add $module:expr,
        passes = [
            $($pass:expr),*
            $(,)?
        ]
    ) => {
        $($module.add_compiler_pass($pass);)*
    };
    {
        $(
            $(#[$($attr:meta),*])*
            $key:ident = $value:tt
        ),*
        $(,)?
    } => {
        {
            #[allow(unused_mut)]
            let mut module = $crate::Module::new();
            $(
                $(#[$($attr),*])*
                $crate::define_module!(@add &mut module, $key = $value);
            )*
            module
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        injectable, Container, InjectError, InjectResult, Service, Svc,
    };
    use std::sync::Mutex;

    #[derive(Default)]
    struct Clock {
        zone: String,
    }

    injectable!(Clock { zone: parameter("clock.zone") });

    #[test]
    fn module_contents_are_added_to_container() {
        let mut module = Module::new();
        module.add_parameter("clock.zone", "UTC");
        module.add("clock", Clock::default()).tag("time");

        let mut container = Container::new();
        container.add_module(module).unwrap();
        container.compile().unwrap();

        let clock: Svc<Clock> = container.get("clock").unwrap();
        assert_eq!("UTC", clock.zone);
        assert_eq!(Some(&["clock".to_owned()][..]), container.tagged_ids("time"));
    }

    #[test]
    fn module_passes_run_after_container_passes() {
        let order: Svc<Mutex<Vec<&'static str>>> = Svc::default();

        let mut module = Module::new();
        let module_order = order.clone();
        module.add_compiler_pass(move |_: &Container| -> InjectResult<()> {
            module_order.lock().unwrap().push("module");
            Ok(())
        });

        let mut container = Container::new();
        let container_order = order.clone();
        container
            .add_compiler_pass(move |_: &Container| -> InjectResult<()> {
                container_order.lock().unwrap().push("container");
                Ok(())
            })
            .unwrap();
        container.add_module(module).unwrap();
        container.compile().unwrap();

        assert_eq!(vec!["container", "module"], *order.lock().unwrap());
    }

    #[test]
    fn module_parameters_replace_existing_ones() {
        let mut container = Container::new();
        container.add_parameter("clock.zone", "CET").unwrap();
        container.add("clock", Clock::default()).unwrap();

        let module = define_module! {
            parameters = {
                "clock.zone" => "UTC",
            },
        };
        container.add_module(module).unwrap();
        container.compile().unwrap();

        let clock: Svc<Clock> = container.get("clock").unwrap();
        assert_eq!("UTC", clock.zone);
    }

    #[test]
    fn define_module_registers_tagged_services() {
        let module = define_module! {
            parameters = {
                "clock.zone" => "UTC",
            },
            services = {
                "clock.utc" => Clock::default() => ["time", "utc"],
                "clock.local" => Clock::default() => ["time"],
            },
        };

        assert_eq!(2, module.definitions().len());
        assert_eq!(Some("UTC"), module.parameters().get("clock.zone"));

        let mut container = Container::new();
        container.add_module(module).unwrap();
        container.compile().unwrap();

        let clocks = container.get_tagged::<Clock>("time").unwrap().unwrap();
        assert_eq!(2, clocks.len());
        let utc = container.get_tagged::<dyn Service>("utc").unwrap().unwrap();
        assert_eq!(1, utc.len());
    }

    #[test]
    fn modules_cannot_be_added_after_compile() {
        let mut container = Container::new();
        container.compile().unwrap();

        match container.add_module(Module::new()) {
            Err(InjectError::Frozen { operation }) => {
                assert_eq!("add a module", operation);
            }
            Err(error) => Err(error).unwrap(),
            Ok(()) => panic!("module added to a compiled container"),
        }
    }
}
