//! Dump and restore through the mount, with byte accounting.

use regmount_core::{single_path_map, Operation, RegistryError, RequestContext};
use tracing::debug;

use super::MountHandler;
use crate::io::{CountingReader, CountingWriter};

impl MountHandler {
    /// Bytes written land on the context even when the dump fails.
    pub(super) fn dump_content(
        &self,
        ctx: &mut RequestContext<'_>,
        op: Operation,
    ) -> Result<(), RegistryError> {
        let full = ctx.resource_path.clone();
        let actual = self.paths.to_actual(&full);
        let scope = ctx.scope();

        let target = match self.target(ctx) {
            Ok(target) => target,
            Err(e) => {
                self.failed(op);
                return Err(RegistryError::delegate("Unable to dump content", e));
            }
        };
        let Some(out) = ctx.dump_writer() else {
            return Err(RegistryError::MissingArgument("dump writer"));
        };

        let mut counting = CountingWriter::new(out);
        let result = {
            let _nested = target.nested(scope, single_path_map(&actual, &full));
            if op == Operation::DumpLite {
                target.store.dump_lite(scope, &actual, &mut counting)
            } else {
                target.store.dump(scope, &actual, &mut counting)
            }
        };
        let bytes = counting.bytes_written();
        ctx.bytes_written = bytes;
        self.transferred(op, bytes);

        if let Err(e) = result {
            self.failed(op);
            return Err(RegistryError::delegate("Unable to dump content", e));
        }
        debug!(
            mount = %self.mount_point(),
            path = %full,
            %actual,
            bytes,
            "dump served by mount"
        );
        ctx.set_processing_complete(true);
        self.delegated(op);
        Ok(())
    }

    /// Bytes read land on the context even when the restore fails.
    pub(super) fn restore_content(
        &self,
        ctx: &mut RequestContext<'_>,
    ) -> Result<(), RegistryError> {
        let full = ctx.resource_path.clone();
        let actual = self.paths.to_actual(&full);
        let scope = ctx.scope();

        let target = match self.target(ctx) {
            Ok(target) => target,
            Err(e) => {
                self.failed(Operation::Restore);
                return Err(RegistryError::delegate("Unable to restore content", e));
            }
        };
        let Some(input) = ctx.dump_reader() else {
            return Err(RegistryError::MissingArgument("restore reader"));
        };

        let mut counting = CountingReader::new(input);
        let result = {
            let _nested = target.nested(scope, single_path_map(&actual, &full));
            target.store.restore(scope, &actual, &mut counting)
        };
        let bytes = counting.bytes_read();
        ctx.bytes_read = bytes;
        self.transferred(Operation::Restore, bytes);

        if let Err(e) = result {
            self.failed(Operation::Restore);
            return Err(RegistryError::delegate("Unable to restore content", e));
        }
        debug!(
            mount = %self.mount_point(),
            path = %full,
            %actual,
            bytes,
            "restore served by mount"
        );
        ctx.set_processing_complete(true);
        self.delegated(Operation::Restore);
        Ok(())
    }
}
