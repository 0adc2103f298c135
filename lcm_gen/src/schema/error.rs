use thiserror::Error;

/// Plan-build time failures. Each one is fatal for the struct it names.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("struct '{name}' is defined more than once")]
    DuplicateStruct { name: String },

    #[error("struct '{struct_name}' declares member '{member}' more than once")]
    DuplicateMember { struct_name: String, member: String },

    #[error("member '{struct_name}.{member}' references unknown struct '{type_name}'")]
    UnknownStruct {
        struct_name: String,
        member: String,
        type_name: String,
    },

    #[error("struct '{name}' is not part of the registry")]
    MissingStruct { name: String },

    #[error("array '{struct_name}.{member}' is sized by unknown member '{size_member}'")]
    UnknownSizeMember {
        struct_name: String,
        member: String,
        size_member: String,
    },

    #[error("array '{struct_name}.{member}' names itself as its own size member")]
    SelfReferentialSize { struct_name: String, member: String },

    #[error(
        "size member '{struct_name}.{size_member}' of array '{member}' must be a signed integer \
         (int8_t..int64_t), found {found}"
    )]
    NonIntegerSize {
        struct_name: String,
        member: String,
        size_member: String,
        found: String,
    },

    #[error(
        "size member '{struct_name}.{size_member}' of array '{member}' must be a scalar, \
         found {dimensions} dimension(s)"
    )]
    NonScalarSize {
        struct_name: String,
        member: String,
        size_member: String,
        dimensions: usize,
    },

    #[error(
        "size member '{struct_name}.{size_member}' is declared at position {size_position} \
         but array '{member}' uses it at position {member_position}"
    )]
    SizeDeclaredAfterArray {
        struct_name: String,
        member: String,
        size_member: String,
        size_position: usize,
        member_position: usize,
    },

    #[error("member '{struct_name}.{member}' is marked as a derived size but no array uses it")]
    OrphanDerivedSize { struct_name: String, member: String },

    #[error("circular struct composition detected: {}", cycle.join(" -> "))]
    CircularComposition { cycle: Vec<String> },
}
