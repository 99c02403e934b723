//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` / `task_kinds` database table.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr => $label:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Wire/API label, e.g. `"generating_image"`.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $label ),+
                }
            }

            /// Look up a variant by its database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Project lifecycle status.
    ProjectStatus {
        Draft = 1 => "draft",
        Generating = 2 => "generating",
        Completed = 3 => "completed",
        Failed = 4 => "failed",
    }
}

define_status_enum! {
    /// Page generation pipeline status.
    PageStatus {
        Pending = 1 => "pending",
        Describing = 2 => "describing",
        GeneratingImage = 3 => "generating_image",
        Completed = 4 => "completed",
        Failed = 5 => "failed",
    }
}

define_status_enum! {
    /// Generation task execution status.
    ///
    /// IDs match the transition table in `slidecraft_core::lifecycle`.
    TaskStatus {
        Pending = 1 => "pending",
        Running = 2 => "running",
        Succeeded = 3 => "succeeded",
        Failed = 4 => "failed",
        Cancelled = 5 => "cancelled",
    }
}

define_status_enum! {
    /// Kind of generation work a task performs.
    TaskKind {
        Outline = 1 => "outline",
        PageDescription = 2 => "page_description",
        ImageGeneration = 3 => "image_generation",
        ImageEdit = 4 => "image_edit",
    }
}

define_status_enum! {
    /// Classification of a task's last error.
    TaskErrorKind {
        Transient = 1 => "transient",
        Permanent = 2 => "permanent",
    }
}

impl TaskStatus {
    /// Whether this status is terminal (succeeded, failed, or cancelled).
    pub fn is_terminal(self) -> bool {
        slidecraft_core::lifecycle::state_machine::is_terminal(self.id())
    }
}
