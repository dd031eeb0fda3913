mod stripe;

pub use stripe::{
    CheckoutSessionObject, GatewayEnvelope, OrderMetadata, PaymentIntentObject, StripeClient,
    SubscriptionObject,
};
