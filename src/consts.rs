// Marker annotations consumed from event classes
pub const CANCELABLE_DESCRIPTOR: &str = "Lnet/minecraftforge/eventbus/api/Cancelable;";
pub const HAS_RESULT_DESCRIPTOR: &str = "Lnet/minecraftforge/eventbus/api/Event$HasResult;";

// Annotation placed on synthesized boolean methods
pub const OVERRIDE_DESCRIPTOR: &str = "Ljava/lang/Override;";

// Legacy listener list accessors stripped from event classes
pub const GET_LISTENER_LIST: &str = "getListenerList";
pub const GET_PARENT_LISTENER_LIST: &str = "getParentListenerList";
pub const LISTENER_LIST_ACCESSOR_DESCRIPTOR: &str = "()Lnet/minecraftforge/eventbus/ListenerList;";

// Boolean capability methods
pub const IS_CANCELABLE: &str = "isCancelable";
pub const HAS_RESULT: &str = "hasResult";
pub const BOOLEAN_GETTER_DESCRIPTOR: &str = "()Z";

// Registrar registry
pub const EVENT_REGISTRAR_REGISTRY: &str = "net/minecraftforge/eventbus/api/EventRegistrarRegistry";
pub const EVENT_REGISTRAR_REGISTRY_DESCRIPTOR: &str = "Lnet/minecraftforge/eventbus/api/EventRegistrarRegistry;";
pub const REGISTRY_INSTANCE_FIELD: &str = "INSTANCE";
pub const REGISTER_INSTANCE: &str = "registerInstance";
pub const REGISTER_INSTANCE_DESCRIPTOR: &str = "(Ljava/lang/Class;Ljava/util/function/BiConsumer;)V";
pub const REGISTER_STATIC: &str = "registerStatic";
pub const REGISTER_STATIC_DESCRIPTOR: &str = "(Ljava/lang/Class;Ljava/util/function/Consumer;)V";

// Handler registration methods generated on subscriber classes
pub const REGISTER_INSTANCE_HANDLERS: &str = "patchwork$registerInstanceEventHandlers";
pub const REGISTER_STATIC_HANDLERS: &str = "patchwork$registerStaticEventHandlers";
pub const REGISTER_STATIC_HANDLERS_DESCRIPTOR: &str = "(Lnet/minecraftforge/eventbus/api/IEventBus;)V";

/// Descriptor of the instance handler registration method of `class_name`
pub fn register_instance_handlers_descriptor(class_name: &str) -> String {
    format!("(L{};Lnet/minecraftforge/eventbus/api/IEventBus;)V", class_name)
}

// Runtime environment query
pub const FABRIC_LOADER: &str = "net/fabricmc/loader/api/FabricLoader";
pub const FABRIC_LOADER_GET_INSTANCE: &str = "getInstance";
pub const FABRIC_LOADER_GET_INSTANCE_DESCRIPTOR: &str = "()Lnet/fabricmc/loader/api/FabricLoader;";
pub const GET_ENVIRONMENT_TYPE: &str = "getEnvironmentType";
pub const GET_ENVIRONMENT_TYPE_DESCRIPTOR: &str = "()Lnet/fabricmc/api/EnvType;";
pub const ENV_TYPE: &str = "net/fabricmc/api/EnvType";
pub const ENV_TYPE_CLIENT: &str = "CLIENT";
pub const ENV_TYPE_DESCRIPTOR: &str = "Lnet/fabricmc/api/EnvType;";

// Event buses
pub const I_EVENT_BUS: &str = "net/minecraftforge/eventbus/api/IEventBus";
pub const I_EVENT_BUS_DESCRIPTOR: &str = "Lnet/minecraftforge/eventbus/api/IEventBus;";
pub const EVENT_BUS_REGISTER: &str = "register";
pub const EVENT_BUS_REGISTER_DESCRIPTOR: &str = "(Ljava/lang/Object;)V";
pub const MINECRAFT_FORGE: &str = "net/minecraftforge/common/MinecraftForge";
pub const FORGE_EVENT_BUS_FIELD: &str = "EVENT_BUS";
pub const MOD_LOADING_CONTEXT: &str = "net/minecraftforge/fml/javafmlmod/FMLJavaModLoadingContext";
pub const MOD_LOADING_CONTEXT_GET: &str = "get";
pub const MOD_LOADING_CONTEXT_GET_DESCRIPTOR: &str = "()Lnet/minecraftforge/fml/javafmlmod/FMLJavaModLoadingContext;";
pub const GET_MOD_EVENT_BUS: &str = "getModEventBus";
pub const GET_MOD_EVENT_BUS_DESCRIPTOR: &str = "()Lnet/minecraftforge/eventbus/api/IEventBus;";

// Closure synthesis
pub const LAMBDA_METAFACTORY: &str = "java/lang/invoke/LambdaMetafactory";
pub const METAFACTORY: &str = "metafactory";
pub const METAFACTORY_DESCRIPTOR: &str = "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodHandle;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;";
pub const CONSUMER_METHOD: &str = "accept";
pub const CONSUMER_FACTORY_DESCRIPTOR: &str = "()Ljava/util/function/Consumer;";
pub const BI_CONSUMER_FACTORY_DESCRIPTOR: &str = "()Ljava/util/function/BiConsumer;";
pub const OBJECT_METHOD_TYPE: &str = "(Ljava/lang/Object;)V";
pub const DUAL_OBJECT_METHOD_TYPE: &str = "(Ljava/lang/Object;Ljava/lang/Object;)V";

// Registrar method generation
pub const DEFAULT_REGISTRAR_METHOD_NAME: &str = "patchwork$registerEventRegistrars";
pub const REGISTRAR_METHOD_DESCRIPTOR: &str = "()V";
pub const REGISTRY_LOCAL_NAME: &str = "registryInstance";
pub const IS_CLIENT_LOCAL_NAME: &str = "isClient";
pub const REGISTRY_SLOT: u16 = 1;
pub const IS_CLIENT_SLOT: u16 = 2;
