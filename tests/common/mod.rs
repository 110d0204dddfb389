// Common test utilities
