//! Declarative service tables.

/// Declare a unary service: its descriptor table and typed clients.
///
/// For each `rpc Method(Req) returns (Res) => fn_name;` line this generates:
///
/// - `procedures::Method`: the full path `/{service}/Method`
/// - `Method`: a [`ProstMethodDescriptor<Req, Res>`](crate::ProstMethodDescriptor) constant
/// - `fn_name` on both typed clients
///
/// all inside the `descriptors` module, together with `SERVICE_NAME` and a
/// `SERVICE` [`ServiceDescriptor`](crate::ServiceDescriptor). The `callback`
/// and `promise` structs wrap [`CallbackClient`](crate::CallbackClient) and
/// [`PromiseClient`](crate::PromiseClient).
///
/// Message types are resolved from the invoking module and must implement
/// `prost::Message + Default`.
///
/// # Example
///
/// ```ignore
/// webrpc_client::unary_service! {
///     /// Greeter service.
///     service "demo.Greeter" {
///         descriptors: greeter;
///         callback: GreeterClient;
///         promise: GreeterPromiseClient;
///
///         /// Say hello.
///         rpc SayHello(HelloRequest) returns (HelloReply) => say_hello;
///     }
/// }
///
/// let client = GreeterPromiseClient::connect("http://localhost:8080")?;
/// let reply = client.say_hello(&HelloRequest::default(), CallOptions::new()).await?;
/// ```
#[macro_export]
macro_rules! unary_service {
    (
        $(#[$service_meta:meta])*
        service $service:literal {
            descriptors: $module:ident;
            callback: $client:ident;
            promise: $promise:ident;

            $(
                $(#[$method_meta:meta])*
                rpc $method:ident($req:ty) returns ($res:ty) => $func:ident;
            )*
        }
    ) => {
        $(#[$service_meta])*
        #[allow(non_upper_case_globals, unused_imports)]
        pub mod $module {
            use super::*;

            /// Fully-qualified service name.
            pub const SERVICE_NAME: &str = $service;

            /// Full method paths.
            pub mod procedures {
                $(
                    pub const $method: &str = concat!("/", $service, "/", stringify!($method));
                )*
            }

            $(
                $(#[$method_meta])*
                pub const $method: $crate::ProstMethodDescriptor<$req, $res> =
                    $crate::MethodDescriptor::new(
                        procedures::$method,
                        $crate::MethodType::Unary,
                        $crate::ProstCodec::new(),
                        $crate::ProstCodec::new(),
                    );
            )*

            /// Method table of this service.
            pub static SERVICE: $crate::ServiceDescriptor = $crate::ServiceDescriptor::new(
                SERVICE_NAME,
                &[$($method.info(stringify!($method)),)*],
            );
        }

        $(#[$service_meta])*
        ///
        /// Callback-style client.
        #[derive(Clone, Debug)]
        pub struct $client {
            inner: $crate::CallbackClient,
        }

        impl $client {
            pub fn new(inner: $crate::CallbackClient) -> Self {
                Self { inner }
            }

            /// Connect with a default transport.
            pub fn connect(
                hostname: impl Into<String>,
            ) -> ::std::result::Result<Self, $crate::ClientBuildError> {
                $crate::ClientBuilder::new(hostname)
                    .build_callback()
                    .map(Self::new)
            }

            pub fn inner(&self) -> &$crate::CallbackClient {
                &self.inner
            }

            pub fn service() -> &'static $crate::ServiceDescriptor {
                &$module::SERVICE
            }

            $(
                $(#[$method_meta])*
                pub fn $func<F>(
                    &self,
                    request: &$req,
                    options: $crate::CallOptions,
                    callback: F,
                ) -> ::std::option::Option<$crate::CallHandle>
                where
                    F: FnOnce(
                            ::std::result::Result<$crate::UnaryResponse<$res>, $crate::ClientError>,
                        ) + Send
                        + 'static,
                {
                    self.inner.unary(&$module::$method, request, options, callback)
                }
            )*
        }

        $(#[$service_meta])*
        ///
        /// Future-style client.
        #[derive(Clone, Debug)]
        pub struct $promise {
            inner: $crate::PromiseClient,
        }

        impl $promise {
            pub fn new(inner: $crate::PromiseClient) -> Self {
                Self { inner }
            }

            /// Connect with a default transport.
            pub fn connect(
                hostname: impl Into<String>,
            ) -> ::std::result::Result<Self, $crate::ClientBuildError> {
                $crate::ClientBuilder::new(hostname)
                    .build_promise()
                    .map(Self::new)
            }

            pub fn inner(&self) -> &$crate::PromiseClient {
                &self.inner
            }

            pub fn service() -> &'static $crate::ServiceDescriptor {
                &$module::SERVICE
            }

            $(
                $(#[$method_meta])*
                pub fn $func(
                    &self,
                    request: &$req,
                    options: $crate::CallOptions,
                ) -> $crate::UnaryFuture<$crate::UnaryResponse<$res>> {
                    self.inner.unary(&$module::$method, request, options)
                }
            )*
        }
    };
}
