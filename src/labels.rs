// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label and annotation keys read from watched Services.
//!
//! A Service opts in to DNS publication through a label or an annotation; the
//! annotation channel exists because some tooling cannot set labels.

/// Label marking a Service as externally addressable when set to [`MARKER_ENABLED`]
pub const EXTERNAL_DNS_LABEL: &str = "external_dns";

/// Annotation marking a Service as externally addressable when set to [`MARKER_ENABLED`]
pub const EXTERNAL_DNS_ANNOTATION: &str = "external_dns";

/// Annotation overriding the published hostname (defaults to the Service name)
pub const EXTERNAL_DNS_HOSTNAME_ANNOTATION: &str = "external_dns_hostname";

/// Marker value that enables publication
pub const MARKER_ENABLED: &str = "true";
