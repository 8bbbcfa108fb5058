mod cart;
mod stock;
