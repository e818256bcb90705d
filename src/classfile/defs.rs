//! Generic classfile-specific definitions

/// Header of Java class file (magic number)
pub const MAGIC: u32 = 0xCAFEBABE;

/// Name of a constructor
pub const CONSTRUCTOR_METHOD_NAME: &str = "<init>";

/// Name of a static initializer
pub const STATIC_INITIALIZER_METHOD_NAME: &str = "<clinit>";

/// JVM version constants
pub mod major_versions {
    pub const JAVA_5_0: u16 = 49;
    pub const JAVA_6_0: u16 = 50;
    pub const JAVA_7: u16 = 51;
    pub const JAVA_8: u16 = 52;
    pub const JAVA_11: u16 = 55;
    pub const JAVA_17: u16 = 61;
    pub const JAVA_21: u16 = 65;
}

pub const JAVA_1_8: u16 = major_versions::JAVA_8;

/// Largest constant pool index a class file can address.
pub const MAX_CONSTANT_POOL_INDEX: usize = u16::MAX as usize - 1;

/// Largest `code_length` of a Code attribute.
pub const MAX_CODE_LENGTH: usize = u16::MAX as usize;

/// Attribute names this crate reads or writes.
pub mod attribute_names {
    pub const CODE: &str = "Code";
    pub const STACK_MAP_TABLE: &str = "StackMapTable";
    pub const LOCAL_VARIABLE_TABLE: &str = "LocalVariableTable";
    pub const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
    pub const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";
    pub const BOOTSTRAP_METHODS: &str = "BootstrapMethods";
    pub const SOURCE_FILE: &str = "SourceFile";

    /// Name of the class-level annotations attribute for the given visibility.
    pub fn annotations(visible: bool) -> &'static str {
        if visible {
            RUNTIME_VISIBLE_ANNOTATIONS
        } else {
            RUNTIME_INVISIBLE_ANNOTATIONS
        }
    }
}
