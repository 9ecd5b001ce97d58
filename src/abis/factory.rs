use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IFactory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }
}
