//! Well-known property names, media types and paths.

/// Root of every registry namespace.
pub const ROOT_PATH: &str = "/";

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '/';

/// Marks a resource served through a link.
pub const REGISTRY_LINK: &str = "registry.link";

/// Set on link nodes that must be restored on the next import.
pub const REGISTRY_LINK_RESTORATION: &str = "registry.linkrestoration";

/// User a mounted resource was fetched as.
pub const REGISTRY_USER: &str = "registry.user";

/// Author configured on the mount.
pub const REGISTRY_AUTHOR: &str = "registry.author";

/// Marks a resource served through a mount.
pub const REGISTRY_MOUNT: &str = "registry.mount";

/// Location of the resource on the mounted instance.
pub const REGISTRY_REAL_PATH: &str = "registry.realpath";

/// Set on collections that were fetched without their children.
pub const REGISTRY_NON_RECURSIVE: &str = "registry.nonrecursive";

/// Mount point recorded on a link node.
pub const REGISTRY_MOUNT_POINT: &str = "registry.mountpoint";

/// Link target recorded on a link node.
pub const REGISTRY_TARGET_POINT: &str = "registry.targetpoint";

/// Tags schema and service-description puts that travel through a remote mount.
pub const REMOTE_MOUNT_OPERATION: &str = "registry.remotemount.operation";

/// Query parameter/property selecting the result type of a stored query.
pub const RESULT_TYPE_PROPERTY: &str = "resultType";

pub const XSD_MEDIA_TYPE: &str = "application/x-xsd+xml";
pub const WSDL_MEDIA_TYPE: &str = "application/wsdl+xml";

/// Media type of advertised mount entries.
pub const MOUNT_MEDIA_TYPE: &str = "application/vnd.regmount.mount";

/// Collection holding one advertised entry per mount.
pub const SYSTEM_MOUNT_PATH: &str = "/_system/local/repository/mounts";

/// Identity used for system bookkeeping writes.
pub const SYSTEM_USER: &str = "regsystem";

/// Identity of unauthenticated sessions.
pub const ANONYMOUS_USER: &str = "anonymous";
